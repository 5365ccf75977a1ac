use crate::config::TelemetryConfig;
use anyhow::{anyhow, Result};
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime,
    trace::{Tracer, TracerProvider},
    Resource,
};
use secrecy::ExposeSecret;
use std::{sync::OnceLock, time::Duration};
use tonic::{
    metadata::{MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;

static TRACER_PROVIDER: OnceLock<TracerProvider> = OnceLock::new();

const ACCESS_TOKEN_HEADER: &str = "signoz-access-token";

// gRPC metadata sent with every export request
fn export_metadata(telemetry: &TelemetryConfig) -> Result<MetadataMap> {
    let mut meta = MetadataMap::new();

    if let Some(token) = &telemetry.access_token {
        let value: MetadataValue<_> = token
            .expose_secret()
            .parse()
            .map_err(|e| anyhow!("invalid OTLP access token: {e}"))?;
        meta.insert(ACCESS_TOKEN_HEADER, value);
    }

    Ok(meta)
}

fn init_tracer(telemetry: &TelemetryConfig, service_name: &str) -> Result<Tracer> {
    let endpoint = telemetry.endpoint.as_str().trim_end_matches('/');

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(3))
        .with_metadata(export_metadata(telemetry)?);

    if telemetry.endpoint.scheme() == "https" {
        let mut tls = ClientTlsConfig::new().with_native_roots();
        if let Some(host) = telemetry.endpoint.host_str() {
            tls = tls.domain_name(host.to_string());
        }
        builder = builder.with_tls_config(tls);
    }

    let exporter = builder.build()?;

    let trace_provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", service_name.to_string()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", Ulid::new().to_string()),
        ]))
        .build();

    let _ = TRACER_PROVIDER.set(trace_provider.clone());

    global::set_tracer_provider(trace_provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    Ok(trace_provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Initialize logging and, when an OTLP endpoint is configured, span export.
///
/// # Errors
///
/// Returns an error if the exporter or the global subscriber cannot be set up
pub fn init(
    verbosity_level: Option<Level>,
    telemetry: Option<&TelemetryConfig>,
    service_name: &str,
) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if let Some(telemetry) = telemetry {
        let tracer = init_tracer(telemetry, service_name)?;
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(otel_layer)
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Flush and stop the span exporter (noop if it was never started)
pub fn shutdown_tracer() {
    if let Some(tp) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = tp.shutdown();
        debug!("tracer provider shutdown complete");
    }
}
