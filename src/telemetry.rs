//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LoggingConfig};

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins over [`LoggingConfig::filter`] when it is set. Calling this
/// a second time reports [`ConfigError::SubscriberInstalled`].
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&config.filter).map_err(|err| ConfigError::InvalidFilter {
                filter: config.filter.clone(),
                message: err.to_string(),
            })?
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true)
        .try_init()
        .map_err(|_| ConfigError::SubscriberInstalled)
}
