//! Log subscriber setup.
//!
//! The library itself only emits `tracing` events; binaries call [`init`]
//! once to print them.

use crate::config::{ConfigError, ConfigResult, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn filter(config: &LoggingConfig) -> ConfigResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config.level.trim())
        .map_err(|e| ConfigError::validation("logging.level", e.to_string()))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed.
pub fn init(config: &LoggingConfig) -> ConfigResult<bool> {
    let filter = filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    Ok(installed.is_ok())
}
