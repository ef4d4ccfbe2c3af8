//! Shared observability plumbing for the broadside telemetry binaries.
//!
//! This crate owns the Prometheus registry wrapper, the scrape/health HTTP
//! endpoint, tracing initialization and the CLI log-format policy, so each
//! binary only decides *what* it reports.

pub mod cli;
pub mod instance;
pub mod observability;

pub use cli::{LogFormat, LogOutput};
pub use instance::service_instance;
pub use observability::{
    init_tracing, HealthSource, MetricsContext, MetricsServer, MetricsServerConfig, OtlpConfig,
    ServiceInfo, TracingGuard,
};
