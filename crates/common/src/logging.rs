//! Logging setup and configuration

use tracing_subscriber::EnvFilter;

/// Setup the tracing subscriber for the application.
///
/// `RUST_LOG` wins over the configured default level. Targets are omitted
/// from the output; module paths add little for a binary this small.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
