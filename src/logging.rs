//! Tracing subscriber setup with optional OpenTelemetry span export

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

const SERVICE_NAME: &str = "travel-planner";

/// Flushes exported spans when dropped
pub struct LoggingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to flush spans: {e}");
            }
        }
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_otel(endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig) -> LoggingGuard {
    let filter = build_filter(&config.level);

    let fmt_layer = if config.format == "json" {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (provider, otel_error) = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => match init_otel(endpoint) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };

    let telemetry_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(telemetry_layer)
        .init();

    match (&config.otlp_endpoint, otel_error) {
        (Some(endpoint), None) => {
            tracing::info!("Tracing initialized with OpenTelemetry export to {}", endpoint);
        }
        (_, Some(e)) => {
            tracing::warn!("Failed to initialize OpenTelemetry: {}. Span export disabled.", e);
        }
        (None, None) => tracing::debug!("Tracing initialized (OpenTelemetry disabled)"),
    }

    LoggingGuard { provider }
}
