//! Log output plus an optional OTLP span exporter.
//!
//! Spans leave the process only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set. The
//! exporter speaks gRPC; `https` collectors are verified against native roots.

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{
    global, propagation::TextMapCompositePropagator, trace::TracerProvider as _, KeyValue,
};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::{env::var, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Collector settings taken from the standard `OTEL_*` variables.
#[derive(Debug, PartialEq)]
struct Collector {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl Collector {
    fn from_env() -> Option<Self> {
        let endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        Some(Self {
            endpoint: normalize_endpoint(&endpoint),
            headers: var("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|headers| parse_headers(&headers))
                .unwrap_or_default(),
            instance_id: var("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|_| Ulid::new().to_string()),
        })
    }

    fn tls_domain(&self) -> Option<&str> {
        self.endpoint
            .strip_prefix("https://")
            .and_then(|rest| rest.split(['/', ':']).next())
            .filter(|host| !host.is_empty())
    }

    fn metadata(&self) -> Result<MetadataMap> {
        let mut meta = MetadataMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let key = MetadataKey::<Ascii>::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|e| anyhow!("invalid OTLP header name {name}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid OTLP header value for {name}: {e}"))?;
            meta.insert(key, value);
        }
        Ok(meta)
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id.clone()),
                KeyValue::new("vcs.ref.head.revision", crate::GIT_COMMIT_HASH),
            ])
            .build()
    }

    fn tracer(&self) -> Result<Tracer> {
        let mut builder = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT);

        if let Some(domain) = self.tls_domain() {
            builder = builder.with_tls_config(
                ClientTlsConfig::new()
                    .domain_name(domain.to_string())
                    .with_native_roots(),
            );
        }

        if !self.headers.is_empty() {
            builder = builder.with_metadata(self.metadata()?);
        }

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(builder.build()?)
            .with_resource(self.resource())
            .build();

        let _ = TRACER_PROVIDER.set(provider.clone());

        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]));

        debug!(endpoint = %self.endpoint, "otlp exporter enabled");

        Ok(provider.tracer(env!("CARGO_PKG_NAME")))
    }
}

// `key=value` pairs separated by commas; malformed pairs are skipped.
fn parse_headers(headers: &str) -> Vec<(String, String)> {
    headers
        .split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    // RUST_LOG= overrides the verbosity flag
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?))
}

/// Initialize logging and, when a collector is configured, span export.
///
/// # Errors
///
/// Returns an error if the exporter or the global subscriber cannot be set up
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let filter = env_filter(verbosity_level.unwrap_or(Level::ERROR))?;

    if let Some(collector) = Collector::from_env() {
        let otel_layer = tracing_opentelemetry::layer().with_tracer(collector.tracer()?);
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

/// Flush pending spans; a no-op when no exporter was started.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        if let Err(err) = provider.shutdown() {
            debug!("tracer provider shutdown failed: {err}");
        }
    }
}
