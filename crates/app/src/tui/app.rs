//! TUI application state and event loop
//!
//! Holds the rendered rows derived from the engine's merged view, the peak
//! tracking and sparkline history, and reacts to key actions and engine
//! lifecycle events.

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use engine::{Engine, EngineEvent, Monitor, WindowCell};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::events::{Action, Event, EventHandler};
use super::ui;

/// Sparkline points to retain
const HISTORY_LEN: usize = 50;
/// UI refresh cadence; throughput itself only changes on compute passes
const TICK_RATE: Duration = Duration::from_millis(250);
/// Upper bound for the window-widening key
const MAX_WINDOW_SECS: f64 = 60.0;

/// One row of the device table
pub struct DeviceRow {
    pub port_label: String,
    pub name: String,
    pub speed_in: f64,
    pub speed_out: f64,
    pub total: f64,
    pub peak: f64,
}

/// Application state
pub struct App {
    monitor: Arc<Monitor>,
    window: Arc<WindowCell>,
    rows: Vec<DeviceRow>,
    /// Highest total seen per device key since start or last clear
    peaks: HashMap<String, f64>,
    /// Aggregate throughput history for the sparkline
    history: Vec<u64>,
    /// Last lifecycle notice, shown in the status bar
    notice: String,
    start_time: Instant,
    should_quit: bool,
}

impl App {
    fn new(monitor: Arc<Monitor>, window: Arc<WindowCell>) -> Self {
        Self {
            monitor,
            window,
            rows: Vec::new(),
            peaks: HashMap::new(),
            history: Vec::new(),
            notice: "waiting for traffic".to_string(),
            start_time: Instant::now(),
            should_quit: false,
        }
    }

    pub fn rows(&self) -> &[DeviceRow] {
        &self.rows
    }

    pub fn history(&self) -> &[u64] {
        &self.history
    }

    pub fn notice(&self) -> &str {
        &self.notice
    }

    pub fn window_secs(&self) -> f64 {
        self.window.get()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Rebuild the table rows from the current merged view
    fn refresh(&mut self) {
        let snapshot = self.monitor.snapshot();

        let mut rows: Vec<DeviceRow> = snapshot
            .into_iter()
            .map(|(key, record)| {
                let speed_of = |direction: &str| {
                    record
                        .communications
                        .get(direction)
                        .map(|c| c.speed_bits_per_sec)
                        .unwrap_or(0.0)
                };
                let speed_in = speed_of("in");
                let speed_out = speed_of("out");
                let total: f64 = record
                    .communications
                    .values()
                    .map(|c| c.speed_bits_per_sec)
                    .sum();

                let peak = self.peaks.entry(key).or_insert(0.0);
                *peak = peak.max(total);

                DeviceRow {
                    port_label: record.port_label,
                    name: record.name,
                    speed_in,
                    speed_out,
                    total,
                    peak: *peak,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            a.port_label
                .cmp(&b.port_label)
                .then_with(|| a.name.cmp(&b.name))
        });

        let aggregate: f64 = rows.iter().map(|row| row.total).sum();
        self.history.push(aggregate as u64);
        if self.history.len() > HISTORY_LEN {
            self.history.remove(0);
        }

        self.rows = rows;
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Clear => {
                self.monitor.clear();
                self.rows.clear();
                self.peaks.clear();
                self.history.clear();
                self.notice = "traffic state cleared".to_string();
            }
            Action::NarrowWindow => {
                self.window.set(self.window.get() / 2.0);
                self.notice = format!("window {:.1}s", self.window.get());
            }
            Action::WidenWindow => {
                self.window.set((self.window.get() * 2.0).min(MAX_WINDOW_SECS));
                self.notice = format!("window {:.1}s", self.window.get());
            }
            Action::None => {}
        }
    }

    fn note_event(&mut self, event: EngineEvent) {
        self.notice = match event {
            EngineEvent::WorkerStarted { interface } => {
                format!("capturing on {}", interface.display)
            }
            EngineEvent::DeviceObserved { name, .. } => format!("observed {}", name),
            EngineEvent::PipelineExited { interface } => {
                format!("pipeline for {} exited", interface.display)
            }
        };
    }
}

/// Run the TUI until the user quits
pub async fn run(engine: &Engine) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, engine).await;

    // Restore the terminal even when the loop errored
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, engine: &Engine) -> Result<()> {
    let mut app = App::new(engine.monitor(), engine.window());
    let mut handler = EventHandler::new(TICK_RATE);
    let engine_events = engine.events();

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            event = handler.next() => match event {
                Some(Event::Key(key)) => app.handle_action(Action::from(key)),
                Some(Event::Tick) => app.refresh(),
                Some(Event::Resize(_, _)) => {}
                None => break,
            },
            event = engine_events.recv() => {
                if let Ok(event) = event {
                    app.note_event(event);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
