//! usbflow
//!
//! Live per-port USB bandwidth monitor. Drives an external capture+decode
//! pipeline for every capture interface, aggregates packets into a rolling
//! throughput metric per device, and renders the result in a terminal table.

mod config;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use common::format::format_bits_per_second;
use common::setup_logging;
use engine::{DeviceRecord, Engine, EngineEvent};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "usbflow")]
#[command(author, version, about = "Live per-port USB bandwidth monitor")]
#[command(long_about = "
Observes USB traffic per physical port by driving an external capture+decode
pipeline and aggregating observed packets into a rolling throughput metric
per device.

EXAMPLES:
    # Run the interactive TUI with the default config
    usbflow

    # Run headless, printing the table once per window period
    usbflow --headless

    # List capture interfaces and exit
    usbflow --list-interfaces

    # Save the default configuration for editing
    usbflow --save-config

CONFIGURATION:
    The monitor looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usbflow/config.toml
    3. /etc/usbflow/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// List capture interfaces and exit
    #[arg(long)]
    list_interfaces: bool,

    /// Run without the TUI, printing the table once per window period
    #[arg(long)]
    headless: bool,

    /// Sliding-window width and refresh period in seconds
    #[arg(short, long, value_name = "SECONDS")]
    frequency: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = config::AppConfig::default();
        let path = config::AppConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if let Some(ref path) = args.config {
        config::AppConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        config::AppConfig::load_or_default()
    };

    if let Some(frequency) = args.frequency {
        config.monitor.frequency_secs = frequency;
    }
    config.validate().context("Invalid configuration")?;

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.monitor.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("usbflow v{}", env!("CARGO_PKG_VERSION"));
    info!("Window: {}s", config.monitor.frequency_secs);

    if args.list_interfaces {
        return list_interfaces_mode(&config);
    }

    let engine = Engine::start(config.engine_config()).context("Failed to start capture engine")?;

    let result = if args.headless {
        info!("Running in headless mode");
        run_headless(&engine).await
    } else {
        info!("Running in TUI mode (interactive)");
        tui::run(&engine).await
    };

    info!("Shutting down capture workers...");
    engine.shutdown();

    result
}

/// List capture interfaces and exit
fn list_interfaces_mode(config: &config::AppConfig) -> Result<()> {
    let engine_config = config.engine_config();
    let interfaces = engine::discovery::list_interfaces(&engine_config.capture.capture_cmd)
        .context("Failed to list capture interfaces")?;

    if interfaces.is_empty() {
        println!("No capture interfaces found.");
    } else {
        println!("Found {} capture interface(s):\n", interfaces.len());
        for interface in interfaces {
            println!("  {} ({})", interface.display, interface.value);
        }
    }

    Ok(())
}

/// Run without a TUI: drain lifecycle events into the log and print the
/// merged table once per window period until Ctrl+C.
async fn run_headless(engine: &Engine) -> Result<()> {
    let monitor = engine.monitor();
    let window = engine.window();

    let events = engine.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EngineEvent::WorkerStarted { interface } => {
                    info!("capturing on {}", interface.display);
                }
                EngineEvent::DeviceObserved { key, name, .. } => {
                    info!("observed {} at {}", name, key);
                }
                EngineEvent::PipelineExited { interface } => {
                    warn!("pipeline for {} exited", interface.display);
                }
            }
        }
    });

    info!("Press Ctrl+C to stop");

    loop {
        let period = std::time::Duration::from_secs_f64(window.get());
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(period) => print_table(&monitor.snapshot()),
        }
    }

    Ok(())
}

/// Print one table of the merged view, sorted by physical location
fn print_table(snapshot: &BTreeMap<String, DeviceRecord>) {
    if snapshot.is_empty() {
        println!("(no traffic observed yet)");
        return;
    }

    let mut records: Vec<_> = snapshot.values().collect();
    records.sort_by(|a, b| a.port_label.cmp(&b.port_label));

    for record in records {
        let mut directions: Vec<_> = record.communications.iter().collect();
        directions.sort_by(|a, b| a.0.cmp(b.0));

        let traffic: Vec<String> = directions
            .iter()
            .map(|(label, communication)| {
                format!(
                    "{} {}",
                    label,
                    format_bits_per_second(communication.speed_bits_per_sec)
                )
            })
            .collect();

        println!(
            "{:<20} {:<40} {}",
            record.port_label,
            record.name,
            traffic.join("  ")
        );
    }
    println!();
}
