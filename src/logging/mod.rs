//! Logging setup shared by the binaries

use tracing::info;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::LoggingConfig;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins over the configured level when it is set and valid.
pub fn init_logging(config: &LoggingConfig) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!(level = %config.level, "logging initialized");
    Ok(())
}
