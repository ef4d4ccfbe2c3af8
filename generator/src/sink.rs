//! Telemetry sinks for sampled events.
//!
//! The sampler only knows the `EventSink` trait. `TelemetrySink` fans each
//! event out to Prometheus, a tracing span and a structured log line; tests
//! plug in their own recorders.

use broadside_common::MetricsContext;
use std::time::Duration;
use tracing::{debug, info_span};

use crate::event::EmailEvent;
use crate::totals::BatchSummary;

/// Receiver of sampled events.
///
/// Called sequentially from the single sampler task. Emission is
/// at-most-once: the sampler never retries or buffers.
pub trait EventSink: Send + Sync {
    /// Records one event and how long its simulated processing took.
    fn emit(&self, event: &EmailEvent, elapsed: Duration);

    /// Called after every batch, including batches cut short by shutdown.
    fn batch_finished(&self, _summary: &BatchSummary) {}
}

/// Sink that records events as Prometheus metrics, spans and logs.
pub struct TelemetrySink {
    // ---
    metrics: MetricsContext,
}

impl TelemetrySink {
    // ---
    pub fn new(metrics: MetricsContext) -> Self {
        // ---
        Self { metrics }
    }
}

impl EventSink for TelemetrySink {
    fn emit(&self, event: &EmailEvent, elapsed: Duration) {
        // ---
        let span = info_span!(
            "record_email_metrics",
            event.id = %event.id,
            event.count = event.count,
            dcs = %event.dcs,
            state = event.state,
            provider = %event.provider,
            status = %event.status,
            region = %event.region,
        );
        let _enter = span.enter();

        let status = event.status.as_str();
        let state = event.state.to_string();
        let count = i64::try_from(event.count).unwrap_or(i64::MAX);
        let seconds = elapsed.as_secs_f64();

        // Counters
        self.metrics
            .email_total
            .with_label_values(&[
                event.dcs.as_str(),
                state.as_str(),
                event.provider.as_str(),
                status,
                event.region.as_str(),
            ])
            .inc_by(event.count);
        self.metrics
            .email_provider_total
            .with_label_values(&[event.provider.as_str(), status])
            .inc_by(event.count);

        // Gauges
        self.metrics
            .email_current
            .with_label_values(&[
                event.dcs.as_str(),
                event.provider.as_str(),
                status,
                event.region.as_str(),
            ])
            .add(count);
        self.metrics
            .email_status_count
            .with_label_values(&[status])
            .add(count);

        self.metrics
            .processing_seconds
            .with_label_values(&[event.provider.as_str(), status, event.region.as_str()])
            .observe(seconds);

        debug!(
            event_id = %event.id,
            dcs = %event.dcs,
            state = event.state,
            provider = %event.provider,
            status,
            region = %event.region,
            count = event.count,
            processing_duration_seconds = seconds,
            "Email processed"
        );
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        // ---
        self.metrics.batches_total.inc();
        self.metrics.batch_size.observe(summary.emitted as f64);
    }
}
