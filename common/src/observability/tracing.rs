//! Tracing initialization.
//!
//! Centralizes tracing config so every binary logs the same way. Spans can
//! additionally be exported over OTLP/gRPC to a collector.

use crate::{LogFormat, LogOutput};
use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing::warn;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::health::ServiceInfo;

/// Where and as whom to export spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtlpConfig {
    // ---
    /// gRPC collector endpoint, e.g. `http://localhost:4317`.
    pub endpoint: String,

    pub service: ServiceInfo,
}

/// Keeps the OTLP exporter alive; `shutdown` flushes pending spans.
#[must_use = "dropping the guard without shutdown may lose buffered spans"]
pub struct TracingGuard {
    // ---
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    // ---
    /// True when spans are exported over OTLP.
    pub fn otlp_enabled(&self) -> bool {
        // ---
        self.provider.is_some()
    }

    /// Flushes and stops the OTLP exporter, if any.
    pub fn shutdown(self) {
        // ---
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                warn!("OTLP tracer provider shutdown failed: {e}");
            }
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// - Respects `RUST_LOG` via `EnvFilter`, defaulting to `info`.
/// - Output shape (pretty / JSON lines) controlled by `LogFormat`.
/// - With `otlp`, spans are also batched to the collector.
///
/// Must be called from within a Tokio runtime when `otlp` is set.
pub fn init_tracing(format: LogFormat, otlp: Option<&OtlpConfig>) -> Result<TracingGuard> {
    // ---
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (pretty_layer, json_layer) = match format.resolve() {
        LogOutput::Pretty { ansi } => (
            Some(fmt::layer().with_ansi(ansi).with_writer(std::io::stderr)),
            None,
        ),
        LogOutput::Json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    let provider = otlp.map(build_otlp_tracer_provider).transpose()?;
    let otel_layer = match (&provider, otlp) {
        (Some(provider), Some(cfg)) => {
            Some(OpenTelemetryLayer::new(provider.tracer(cfg.service.name.clone())))
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(TracingGuard { provider })
}

fn otlp_resource(service: &ServiceInfo) -> Resource {
    // ---
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", service.name.clone()),
            KeyValue::new("service.version", service.version.clone()),
            KeyValue::new("service.instance.id", service.instance.clone()),
        ])
        .build()
}

fn build_otlp_tracer_provider(cfg: &OtlpConfig) -> Result<SdkTracerProvider> {
    // ---
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(cfg.endpoint.clone())
        .build()
        .with_context(|| format!("failed to build OTLP exporter for {}", cfg.endpoint))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(otlp_resource(&cfg.service))
        .build())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn otlp(endpoint: &str) -> OtlpConfig {
        // ---
        OtlpConfig {
            endpoint: endpoint.to_string(),
            service: ServiceInfo::new("test-service", "0.0.1", "10.0.0.7"),
        }
    }

    #[tokio::test]
    async fn exporter_builds_without_a_reachable_collector() {
        // ---
        let provider = build_otlp_tracer_provider(&otlp("http://127.0.0.1:4317"))
            .expect("exporter connects lazily");
        let guard = TracingGuard {
            provider: Some(provider),
        };
        assert!(guard.otlp_enabled());
        guard.shutdown();
    }

    #[tokio::test]
    async fn malformed_endpoint_is_rejected() {
        // ---
        let err = build_otlp_tracer_provider(&otlp("not a uri")).err().expect("bad uri");
        assert!(err.to_string().contains("not a uri"), "{err}");
    }

    #[test]
    fn resource_carries_service_identity() {
        // ---
        let resource = otlp_resource(&otlp("http://127.0.0.1:4317").service);
        let attrs: Vec<(String, String)> = resource
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_string()))
            .collect();
        assert!(attrs.contains(&("service.name".into(), "test-service".into())));
        assert!(attrs.contains(&("service.version".into(), "0.0.1".into())));
        assert!(attrs.contains(&("service.instance.id".into(), "10.0.0.7".into())));
    }

    #[test]
    fn guard_without_exporter_is_inert() {
        // ---
        let guard = TracingGuard { provider: None };
        assert!(!guard.otlp_enabled());
        guard.shutdown();
    }
}
