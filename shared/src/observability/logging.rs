//! Structured logging setup for the wallet services

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::{ObservabilityError, ObservabilityResult};

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for local development
    Pretty,
    /// JSON format for log aggregation
    Json,
    /// Compact single-line format
    Compact,
}

impl FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(ObservabilityError::Logging(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}

/// Initialize logging for a service. The filter comes from `RUST_LOG` when
/// set, defaulting to `info` otherwise.
pub fn init_service_logging(service_name: &str, format: LogFormat) -> ObservabilityResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_line_number(true).pretty())
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };
    result.map_err(|e| ObservabilityError::Logging(e.to_string()))?;

    tracing::info!(service = %service_name, "Logging initialized");
    Ok(())
}

/// Quick setup with sensible defaults for tests and local runs.
pub fn init_default_logging(service_name: &str) -> ObservabilityResult<()> {
    init_service_logging(service_name, LogFormat::Pretty)
}
