//! Logging bootstrap
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{ToolError, ToolResult};

/// Install the global subscriber
///
/// Returns `false` if a subscriber was already installed, which leaves the
/// existing one in place.
///
/// # Errors
///
/// Returns [`ToolError::Config`] if the configured filter is invalid.
pub fn init(config: &LoggingConfig) -> ToolResult<bool> {
    let filter = build_env_filter(&config.filter)?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    };
    Ok(installed.is_ok())
}

fn build_env_filter(directives: &str) -> ToolResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(directives)
            .map_err(|e| ToolError::Config(format!("invalid log filter '{}': {}", directives, e))),
    }
}
