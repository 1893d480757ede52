//! ckt-telemetry
//!
//! OTLP export pipelines (traces, metrics, logs) for the checkout gateway,
//! plus the custom metric instruments every handler records into.
//!
//! One collector base URL fans out to the three signal sub-paths
//! (`/v1/traces`, `/v1/metrics`, `/v1/logs`). Export is batched and
//! asynchronous: a slow or dead collector never blocks request handling;
//! records are buffered and dropped once the queue is exhausted.
//!
//! There are no module-level globals here. `Telemetry::init` builds one
//! handle that the daemon threads through `AppState`; tests construct a
//! `Telemetry::disabled()` handle that records into a manual reader and
//! exports nothing.

pub mod metrics;

use std::sync::{Arc, Weak};
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::logs::LoggerProvider;
use opentelemetry_sdk::metrics::data::{ResourceMetrics, Temporality};
use opentelemetry_sdk::metrics::reader::{MetricReader, TemporalitySelector};
use opentelemetry_sdk::metrics::{InstrumentKind, ManualReader, Pipeline, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace as sdktrace;
use opentelemetry_sdk::trace::BatchConfigBuilder;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use metrics::Metrics;

/// Spans buffered before the batch processor starts dropping.
pub const SPAN_QUEUE_SIZE: usize = 2048;
/// Spans sent per export request.
pub const SPAN_EXPORT_BATCH_SIZE: usize = 512;
/// Upper bound on one trace export request.
pub const TRACE_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);
/// Interval between periodic metric exports.
pub const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound on one metric export request.
pub const METRIC_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline configuration. The knobs default to the constants above; they
/// exist as fields so a deployment can tune them without a code change.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// Collector base URL; signal sub-paths are derived from it.
    pub collector_base_url: String,
    pub instance_id: String,
    pub environment: String,
    pub span_queue_size: usize,
    pub span_export_batch_size: usize,
    pub trace_export_timeout: Duration,
    pub metric_export_interval: Duration,
    pub metric_export_timeout: Duration,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, collector_base_url: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            collector_base_url: collector_base_url.into(),
            instance_id: "localhost".to_string(),
            environment: "development".to_string(),
            span_queue_size: SPAN_QUEUE_SIZE,
            span_export_batch_size: SPAN_EXPORT_BATCH_SIZE,
            trace_export_timeout: TRACE_EXPORT_TIMEOUT,
            metric_export_interval: METRIC_EXPORT_INTERVAL,
            metric_export_timeout: METRIC_EXPORT_TIMEOUT,
        }
    }

    /// Static resource attributes stamped onto every exported record.
    fn resource(&self) -> Resource {
        Resource::new(vec![
            KeyValue::new("service.name", self.service_name.clone()),
            KeyValue::new("service.version", self.service_version.clone()),
            KeyValue::new("service.instance.id", self.instance_id.clone()),
            KeyValue::new("deployment.environment", self.environment.clone()),
        ])
    }
}

/// Per-signal OTLP ingestion URLs derived from one collector base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalUrls {
    pub traces: String,
    pub metrics: String,
    pub logs: String,
}

/// Derive the three signal URLs, tolerating a trailing slash on the base.
pub fn signal_urls(collector_base_url: &str) -> SignalUrls {
    let base = collector_base_url.trim_end_matches('/');
    SignalUrls {
        traces: format!("{base}/v1/traces"),
        metrics: format!("{base}/v1/metrics"),
        logs: format!("{base}/v1/logs"),
    }
}

/// Failures while installing an export pipeline at startup.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to install trace exporter: {0}")]
    Trace(#[from] opentelemetry::trace::TraceError),
    #[error("failed to install metric exporter: {0}")]
    Metrics(#[from] opentelemetry::metrics::MetricsError),
    #[error("failed to install log exporter: {0}")]
    Logs(#[from] opentelemetry::logs::LogError),
}

/// Handle over the tracer, the metric instruments and the export providers.
///
/// Cheap to clone (everything inside is arc-backed); handlers receive it via
/// `AppState` rather than through a process-wide global.
#[derive(Clone)]
pub struct Telemetry {
    /// Tracer the request envelope opens handler spans on.
    pub tracer: sdktrace::Tracer,
    /// Shared metric instruments.
    pub metrics: Metrics,
    tracer_provider: sdktrace::TracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: Option<LoggerProvider>,
}

impl Telemetry {
    /// Build the three OTLP pipelines against the configured collector.
    ///
    /// Must run inside a tokio runtime: the batch processors spawn their
    /// flush tasks on it.
    pub fn init(cfg: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let urls = signal_urls(&cfg.collector_base_url);
        let resource = cfg.resource();

        global::set_text_map_propagator(TraceContextPropagator::new());

        // install_batch hands back the provider; it does not register a
        // global one. The provider is kept on the handle so shutdown can
        // flush its batch processor.
        let tracer_provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_protocol(Protocol::HttpBinary)
                    .with_endpoint(urls.traces)
                    .with_timeout(cfg.trace_export_timeout),
            )
            .with_trace_config(sdktrace::Config::default().with_resource(resource.clone()))
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_max_queue_size(cfg.span_queue_size)
                    .with_max_export_batch_size(cfg.span_export_batch_size)
                    .with_max_export_timeout(cfg.trace_export_timeout)
                    .build(),
            )
            .install_batch(runtime::Tokio)?;
        let tracer = tracer_provider.tracer("ckt-telemetry");

        let meter_provider = opentelemetry_otlp::new_pipeline()
            .metrics(runtime::Tokio)
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_protocol(Protocol::HttpBinary)
                    .with_endpoint(urls.metrics)
                    .with_timeout(cfg.metric_export_timeout),
            )
            .with_resource(resource.clone())
            .with_period(cfg.metric_export_interval)
            .build()?;
        let metrics = Metrics::new(&meter_provider.meter("ckt-telemetry"));

        let logger_provider = opentelemetry_otlp::new_pipeline()
            .logging()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_protocol(Protocol::HttpBinary)
                    .with_endpoint(urls.logs),
            )
            .with_resource(resource)
            .install_batch(runtime::Tokio)?;

        Ok(Self {
            tracer,
            metrics,
            tracer_provider,
            meter_provider,
            logger_provider: Some(logger_provider),
        })
    }

    /// Telemetry handle that records into a manual reader and exports
    /// nothing. Used by tests and by tooling that has no collector.
    pub fn disabled() -> Self {
        Self::disabled_with_reader().0
    }

    /// Like [`Telemetry::disabled`], but hands back the reader so a test
    /// can collect the recorded metrics and assert on them.
    pub fn disabled_with_reader() -> (Self, SharedReader) {
        let tracer_provider = sdktrace::TracerProvider::builder().build();
        let tracer = tracer_provider.tracer("ckt-telemetry");

        let reader = SharedReader(Arc::new(ManualReader::builder().build()));
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(reader.clone())
            .build();
        let metrics = Metrics::new(&meter_provider.meter("ckt-telemetry"));

        (
            Self {
                tracer,
                metrics,
                tracer_provider,
                meter_provider,
                logger_provider: None,
            },
            reader,
        )
    }

    /// Flush and shut down the export pipelines. Called once at process
    /// exit so buffered spans/metrics/logs reach the collector.
    pub fn shutdown(&self) {
        let _ = self.tracer_provider.shutdown();
        let _ = self.meter_provider.shutdown();
        if let Some(logger_provider) = &self.logger_provider {
            let _ = logger_provider.shutdown();
        }
    }
}

/// Cloneable handle over a [`ManualReader`]: one clone is installed in the
/// meter provider, the other stays with the caller for collection.
#[derive(Clone, Debug)]
pub struct SharedReader(Arc<ManualReader>);

impl SharedReader {
    /// Collect everything recorded so far into `rm`.
    pub fn collect(&self, rm: &mut ResourceMetrics) -> opentelemetry::metrics::Result<()> {
        self.0.collect(rm)
    }
}

impl TemporalitySelector for SharedReader {
    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        self.0.temporality(kind)
    }
}

impl MetricReader for SharedReader {
    fn register_pipeline(&self, pipeline: Weak<Pipeline>) {
        self.0.register_pipeline(pipeline)
    }

    fn collect(&self, rm: &mut ResourceMetrics) -> opentelemetry::metrics::Result<()> {
        self.0.collect(rm)
    }

    fn force_flush(&self) -> opentelemetry::metrics::Result<()> {
        self.0.force_flush()
    }

    fn shutdown(&self) -> opentelemetry::metrics::Result<()> {
        self.0.shutdown()
    }
}

/// Wire the `tracing` subscriber: console output, env-filter, span export
/// through the OTel layer, and log-record export through the appender
/// bridge (when a log pipeline exists).
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_subscriber(telemetry: &Telemetry, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let otel_layer = tracing_opentelemetry::layer().with_tracer(telemetry.tracer.clone());

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer);

    match &telemetry.logger_provider {
        Some(logger_provider) => registry
            .with(OpenTelemetryTracingBridge::new(logger_provider))
            .init(),
        None => registry.init(),
    }
}
