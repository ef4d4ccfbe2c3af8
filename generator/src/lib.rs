//! Synthetic email telemetry generator.
//!
//! Samples email-processing events from weighted configuration tables,
//! paces them in time-of-day shaped batches and hands each one to an
//! `EventSink`. The binary wires the sampler to Prometheus metrics,
//! tracing spans and structured logs.

pub mod config;
pub mod event;
pub mod runner;
pub mod sampler;
pub mod sink;
pub mod status;
pub mod totals;
pub mod traffic;
pub mod weighted;

pub use config::{ConfigError, GeneratorConfig};
pub use event::EmailEvent;
pub use runner::SamplerHandle;
pub use sampler::{EventSampler, ProviderProfile};
pub use sink::{EventSink, TelemetrySink};
pub use status::{EmailStatus, StatusRates};
pub use totals::{BatchSummary, RunningTotals};
pub use traffic::{BatchPlan, TrafficProfile};
pub use weighted::{TableError, WeightedTable};
