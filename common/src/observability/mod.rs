//! Observability utilities (metrics + health + tracing + OTLP export).

mod health;
mod metrics;
mod tracing;

pub use health::{HealthSource, ServiceInfo};
pub use metrics::{MetricsContext, MetricsServer, MetricsServerConfig, PROCESSING_BUCKETS};
pub use self::tracing::{init_tracing, OtlpConfig, TracingGuard};
