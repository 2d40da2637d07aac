//! Logging and optional OTLP trace export.
//!
//! The fmt layer is always installed. Spans are also exported over gRPC when
//! `--otlp-endpoint` (`EVCHARGE_OTLP_ENDPOINT`) names a collector.

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{SdkTracerProvider, Tracer},
};
use std::time::Duration;
use tonic::transport::ClientTlsConfig;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use url::Url;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Crates that are noisy at the levels this service logs at.
const QUIET_TARGETS: [&str; 4] = [
    "hyper=error",
    "tokio=error",
    "sqlx=warn",
    "opentelemetry_sdk=warn",
];

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// A validated collector address.
#[derive(Debug, PartialEq, Eq)]
struct Collector {
    endpoint: String,
    tls_domain: Option<String>,
}

/// Accepts `host:port` or an `http(s)` URL. A bare authority is dialed over
/// TLS; only `https` collectors get a TLS config.
fn collector(raw: &str) -> Result<Collector> {
    let raw = raw.trim().trim_end_matches('/');
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let url = Url::parse(&with_scheme)
        .with_context(|| format!("Invalid OTLP endpoint: {raw}"))?;
    let tls_domain = match url.scheme() {
        "https" => url.host_str().map(str::to_string),
        "http" => None,
        other => bail!("Unsupported OTLP endpoint scheme: {other}"),
    };
    if url.host_str().is_none() {
        bail!("OTLP endpoint must include a host: {raw}");
    }

    Ok(Collector {
        endpoint: with_scheme,
        tls_domain,
    })
}

/// Default level from `-v`, overridable per target with `RUST_LOG`.
fn filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

fn init_tracer(collector: &Collector) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&collector.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = &collector.tls_domain {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.clone())
                .with_native_roots(),
        );
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(builder.build()?)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.commit", crate::GIT_COMMIT_HASH),
                ])
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Install the global subscriber. `verbosity_level` defaults to ERROR.
///
/// # Errors
///
/// Returns an error if the endpoint is malformed or the exporter or the
/// subscriber cannot be installed.
pub fn init(verbosity_level: Option<Level>, otlp_endpoint: Option<&str>) -> Result<()> {
    let fmt_layer = fmt::layer().with_target(false).pretty();
    let filter = filter(verbosity_level.unwrap_or(Level::ERROR))?;

    match otlp_endpoint {
        Some(raw) => {
            let tracer = init_tracer(&collector(raw)?)?;
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            tracing::subscriber::set_global_default(
                Registry::default().with(fmt_layer).with(filter),
            )?;
        }
    }

    Ok(())
}

/// Flush pending spans. Noop when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(err) = provider.shutdown()
    {
        debug!("Tracer provider shutdown failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_authority_is_dialed_over_tls() -> Result<()> {
        let collector = collector("otel.evcharge.dev:4317/")?;
        assert_eq!(collector.endpoint, "https://otel.evcharge.dev:4317");
        assert_eq!(collector.tls_domain.as_deref(), Some("otel.evcharge.dev"));
        Ok(())
    }

    #[test]
    fn plain_http_has_no_tls() -> Result<()> {
        assert_eq!(
            collector("http://localhost:4317")?,
            Collector {
                endpoint: "http://localhost:4317".to_string(),
                tls_domain: None,
            }
        );
        Ok(())
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(collector("udp://otel.evcharge.dev:4317").is_err());
        assert!(collector("https://").is_err());
    }

    #[test]
    fn quiet_targets_parse() -> Result<()> {
        let filter = filter(Level::DEBUG)?;
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx=warn"));
        assert!(rendered.contains("hyper=error"));
        Ok(())
    }

    #[test]
    fn shutdown_without_provider_is_noop() {
        shutdown_tracer();
    }
}
