//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::errors::FanoutError;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` wins, then the configured directive.
///
/// # Errors
///
/// Returns an error if the configured directive does not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, FanoutError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| FanoutError::Logging(format!("invalid filter '{}': {e}", config.filter))),
    }
}

/// Installs a global fmt subscriber, human-readable or JSON.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), FanoutError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| FanoutError::Logging(e.to_string()))
}
