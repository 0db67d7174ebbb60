//! Global initialization utilities for the application

use std::sync::Once;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize the application environment
///
/// Loads variables from a `.env` file in the current directory (or a parent)
/// before any configuration is read. Safe to call multiple times.
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

/// Errors raised while installing the global tracing subscriber
#[derive(Debug, Error)]
pub enum TracingInitError {
    #[error("Invalid tracing filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence when set; otherwise `default_level` is used as
/// the filter directive.
///
/// # Errors
///
/// Returns `TracingInitError` if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(default_level: &str, format: LogFormat) -> Result<(), TracingInitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| {
            TracingInitError::InvalidFilter {
                filter: default_level.to_string(),
                message: e.to_string(),
            }
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| TracingInitError::Install(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_environment_is_idempotent() {
        initialize_environment();
        initialize_environment();
    }

    #[test]
    fn second_install_reports_error() {
        // Whichever call wins the race installs the subscriber; the other must fail cleanly.
        let first = init_tracing("info", LogFormat::Text);
        let second = init_tracing("info", LogFormat::Json);
        assert!(first.is_err() || second.is_err());
    }
}
