//! Batch loop and the supervised sampler task.

use anyhow::{Context, Result};
use chrono::{Local, Timelike};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::sampler::EventSampler;
use crate::sink::EventSink;
use crate::status::EmailStatus;
use crate::totals::BatchSummary;
use crate::traffic::BatchPlan;

impl EventSampler {
    // ---
    /// Runs one batch sized for the current local hour.
    pub async fn run_batch(
        &mut self,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        // ---
        let hour = Local::now().hour();
        self.run_batch_at(hour, sink, cancel).await
    }

    /// Runs one batch sized for `hour`.
    ///
    /// Each unit sleeps its simulated processing time before it is emitted.
    /// Cancellation is checked between units; a unit already in flight
    /// completes, so the batch may end short of its plan.
    pub async fn run_batch_at(
        &mut self,
        hour: u32,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        // ---
        let plan = self.traffic.plan_batch(hour, &mut self.rng);
        let span = info_span!(
            "process_email_batch",
            batch.total_emails = plan.size as u64,
            batch.hour = plan.hour,
            batch.base = plan.base,
            batch.multiplier = plan.multiplier,
        );
        self.process_batch(plan, sink, cancel).instrument(span).await
    }

    async fn process_batch(
        &mut self,
        plan: BatchPlan,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        // ---
        let mut summary = BatchSummary::new(plan.size);

        for _ in 0..plan.size {
            if cancel.is_cancelled() {
                debug!(
                    emitted = summary.emitted,
                    planned = summary.planned,
                    "Batch cut short by shutdown"
                );
                break;
            }

            let (event, processing) = self.sample();
            let started = Instant::now();
            tokio::time::sleep(processing).await;

            sink.emit(&event, started.elapsed());
            self.totals.record(&event);
            summary.record(&event);
        }

        self.totals.record_batch();
        sink.batch_finished(&summary);

        info!(
            total_emails = summary.emitted,
            planned = summary.planned,
            total_sent = self.totals.get(EmailStatus::Sent),
            total_in_transit = self.totals.get(EmailStatus::InTransit),
            total_bounced = self.totals.get(EmailStatus::Bounced),
            total_rejected = self.totals.get(EmailStatus::Rejected),
            batch_by_provider = %summary.provider_breakdown(),
            "Processed email batch"
        );
        summary
    }

    /// Runs batches until `cancel` fires, returning the number of batches.
    ///
    /// Every batch is followed by a random pause from the configured
    /// interval; the pause is abandoned as soon as cancellation is seen.
    pub async fn run(mut self, sink: Arc<dyn EventSink>, cancel: CancellationToken) -> u64 {
        // ---
        info!("Email sampler started");
        let mut batches = 0;

        while !cancel.is_cancelled() {
            self.run_batch(sink.as_ref(), &cancel).await;
            batches += 1;

            let pause = self.next_interval();
            debug!(pause_ms = pause.as_millis() as u64, "Waiting for next batch");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(batches, events = self.totals.events(), "Email sampler stopped");
        batches
    }

    /// Moves the sampler onto its own task.
    pub fn spawn(self, sink: Arc<dyn EventSink>) -> SamplerHandle {
        // ---
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(sink, cancel.clone()));
        SamplerHandle { cancel, task }
    }
}

/// Owner of a running sampler task.
///
/// Dropping the handle detaches the task; call `shutdown` to stop it.
pub struct SamplerHandle {
    // ---
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl SamplerHandle {
    // ---
    /// Cancels the sampler and waits for it to finish.
    ///
    /// Once this returns no further `emit` calls happen.
    pub async fn shutdown(self) -> Result<u64> {
        // ---
        self.cancel.cancel();
        self.task.await.context("sampler task failed")
    }
}
