//! Trace export for Augur.
//!
//! Spans are bridged from `tracing` into OpenTelemetry and exported over
//! OTLP/HTTP (protobuf) to a collector such as Arize Phoenix. The project
//! label is attached as a resource attribute so the collector can group
//! traces per project.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

use crate::error::{AppError, AppResult};

/// Default OTLP/HTTP trace endpoint (a local Phoenix instance).
pub const DEFAULT_ENDPOINT: &str = "http://localhost:6006/v1/traces";

/// Project label used when `PROJECT_NAME` is not set.
pub const DEFAULT_PROJECT_NAME: &str = "dspy-demo";

/// Environment variable holding the project label.
pub const PROJECT_NAME_ENV: &str = "PROJECT_NAME";

/// Instrumentation scope name reported with every span.
const INSTRUMENTATION_SCOPE: &str = "augur";

/// Targets of the instrumented library crates.
///
/// Spans from these targets are only exported when auto-instrumentation
/// is enabled.
const LIBRARY_TARGETS: &[&str] = &["augur_llm", "augur_predict"];

/// Trace export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Register the exporter at all
    pub enabled: bool,

    /// Collector endpoint, used verbatim
    pub endpoint: String,

    /// Project label forwarded to the collector
    pub project_name: String,

    /// Batch spans before export instead of exporting each span on end
    pub batch: bool,

    /// Export spans emitted by the LM and Predict instrumentation
    pub auto_instrument: bool,

    /// Log the export details at registration
    pub verbose: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            batch: true,
            auto_instrument: true,
            verbose: false,
        }
    }
}

impl TelemetryConfig {
    /// Name of the span processor selected by the `batch` flag.
    pub fn processor_name(&self) -> &'static str {
        if self.batch {
            "BatchSpanProcessor"
        } else {
            "SimpleSpanProcessor"
        }
    }

    /// Whether spans from `target` are forwarded to the exporter.
    ///
    /// Only Augur's own crates are exported; third-party spans (HTTP
    /// clients, the exporter itself) never are.
    pub fn exports_target(&self, target: &str) -> bool {
        if !is_own_target(target) {
            return false;
        }

        self.auto_instrument || !is_library_target(target)
    }

    /// Human-readable summary of the export setup.
    pub fn describe(&self) -> String {
        format!(
            "OpenTelemetry tracing details:\n\
             |  Project: {}\n\
             |  Span processor: {}\n\
             |  Collector endpoint: {}\n\
             |  Transport: HTTP + protobuf\n\
             |  Auto-instrumentation: {}",
            self.project_name,
            self.processor_name(),
            self.endpoint,
            if self.auto_instrument { "on" } else { "off" },
        )
    }
}

/// Resolve the project label from an optional environment value.
///
/// Only an unset variable falls back to the default; an explicitly empty
/// value is forwarded as-is.
pub fn resolve_project_name(value: Option<String>) -> String {
    value.unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
}

fn is_own_target(target: &str) -> bool {
    match target.strip_prefix(INSTRUMENTATION_SCOPE) {
        Some(rest) => rest.is_empty() || rest.starts_with("::") || rest.starts_with('_'),
        None => false,
    }
}

fn is_library_target(target: &str) -> bool {
    LIBRARY_TARGETS.iter().any(|lib| target.starts_with(lib))
}

/// Keeps the tracer provider alive and flushes pending spans on drop.
pub struct TelemetryGuard {
    provider: TracerProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!("Failed to flush trace exporter: {}", e);
        }
    }
}

/// Build the OpenTelemetry layer and register the global tracer provider.
///
/// The exporter is not contacted here: an unreachable collector only
/// surfaces as export errors reported by the exporter, never as a failure
/// of the program.
///
/// Batch export spawns its worker on the tokio runtime, so this must be
/// called from within one when `batch` is set.
pub fn build_layer<S>(
    config: &TelemetryConfig,
) -> AppResult<(OpenTelemetryLayer<S, Tracer>, TelemetryGuard)>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(config.endpoint.clone())
        .build()
        .map_err(|e| AppError::Telemetry(format!("Failed to build OTLP exporter: {}", e)))?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.project_name.clone()),
        KeyValue::new("openinference.project.name", config.project_name.clone()),
    ]);

    let builder = TracerProvider::builder().with_resource(resource);
    let builder = if config.batch {
        builder.with_batch_exporter(exporter, runtime::Tokio)
    } else {
        builder.with_simple_exporter(exporter)
    };
    let provider = builder.build();

    let tracer = provider.tracer(INSTRUMENTATION_SCOPE);
    opentelemetry::global::set_tracer_provider(provider.clone());

    let layer = tracing_opentelemetry::layer().with_tracer(tracer);
    Ok((layer, TelemetryGuard { provider }))
}
