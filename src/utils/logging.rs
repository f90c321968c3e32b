//! Structured logging setup.

use std::fs::OpenOptions;
use std::sync::Mutex;

use crate::config::LoggingConfig;
use crate::error::{LoginError, Result};

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr, or are appended to the configured file without ANSI
/// colours. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(config.log_level.as_tracing())
        .with_target(false);

    let installed = match config.log_path() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| LoginError::ConfigError(format!("Failed to install logger: {e}")))
}
