//! Logging infrastructure for Augur.
//!
//! This module initializes the tracing subscriber for structured logging
//! and, when enabled, the OpenTelemetry layer that exports spans.
//! All logs are emitted to stderr to keep stdout clean for the answer.

use std::io::IsTerminal;

use tracing_subscriber::{
    filter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::error::{AppError, AppResult};
use crate::telemetry::{self, TelemetryConfig, TelemetryGuard};

/// Initialize the tracing subscriber with stderr output and trace export.
///
/// This sets up:
/// - Output to stderr (stdout is reserved for data)
/// - Environment-based filtering (RUST_LOG or provided level) for the log output
/// - Optional ANSI color control
/// - OTLP span export filtered to Augur's own targets, when `telemetry.enabled`
///
/// The returned guard must be held until the program exits; dropping it
/// flushes pending spans.
///
/// # Example
/// ```no_run
/// use augur_core::logging::init_logging;
/// use augur_core::telemetry::TelemetryConfig;
///
/// # #[tokio::main]
/// # async fn main() {
/// let _guard = init_logging(None, false, &TelemetryConfig::default())
///     .expect("Failed to initialize logging");
/// # }
/// ```
pub fn init_logging(
    log_level: Option<&str>,
    no_color: bool,
    telemetry: &TelemetryConfig,
) -> AppResult<Option<TelemetryGuard>> {
    // Determine the filter level
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color())
        .with_filter(env_filter);

    let (otel_layer, guard) = if telemetry.enabled {
        let (layer, guard) = telemetry::build_layer(telemetry)?;
        let exported = telemetry.clone();
        let layer = layer.with_filter(filter::filter_fn(move |meta| {
            exported.exports_target(meta.target())
        }));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    if telemetry.enabled && telemetry.verbose {
        tracing::info!("{}", telemetry.describe());
    }

    Ok(guard)
}

/// Check if stderr supports color output.
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    std::io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let telemetry = TelemetryConfig {
            enabled: false,
            ..TelemetryConfig::default()
        };
        let result = init_logging(Some("augur=notalevel"), true, &telemetry);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
