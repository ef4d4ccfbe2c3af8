//! Running totals and per-batch summaries.
//!
//! Totals are advisory: they feed log summaries and the health endpoint,
//! nothing downstream depends on them being exact at any instant.

use broadside_common::HealthSource;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::EmailEvent;
use crate::status::EmailStatus;

/// Cumulative email counts per status for the lifetime of the process.
///
/// Written by the sampler task only; atomics make concurrent reads from the
/// health endpoint safe.
#[derive(Debug, Default)]
pub struct RunningTotals {
    // ---
    by_status: [AtomicU64; 4],
    events: AtomicU64,
    batches: AtomicU64,
}

impl RunningTotals {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    pub fn record(&self, event: &EmailEvent) {
        // ---
        self.by_status[event.status.index()].fetch_add(event.count, Ordering::Relaxed);
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        // ---
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative count for one status.
    pub fn get(&self, status: EmailStatus) -> u64 {
        // ---
        self.by_status[status.index()].load(Ordering::Relaxed)
    }

    /// Number of events recorded.
    pub fn events(&self) -> u64 {
        // ---
        self.events.load(Ordering::Relaxed)
    }

    /// Number of batches completed.
    pub fn batches(&self) -> u64 {
        // ---
        self.batches.load(Ordering::Relaxed)
    }

    /// `(status, total)` pairs in `EmailStatus::ALL` order.
    pub fn snapshot(&self) -> [(EmailStatus, u64); 4] {
        // ---
        EmailStatus::ALL.map(|status| (status, self.get(status)))
    }
}

impl HealthSource for RunningTotals {
    fn details(&self) -> Value {
        let totals: Map<String, Value> = self
            .snapshot()
            .into_iter()
            .map(|(status, total)| (status.as_str().to_string(), json!(total)))
            .collect();

        json!({
            "totals": totals,
            "events": self.events(),
            "batches": self.batches(),
        })
    }
}

/// Per-batch breakdown of email counts by provider and status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    // ---
    /// Events emitted in this batch.
    pub emitted: usize,

    /// Events planned for this batch (more than `emitted` if cancelled).
    pub planned: usize,

    pub by_provider: BTreeMap<String, BTreeMap<EmailStatus, u64>>,
}

impl BatchSummary {
    // ---
    pub fn new(planned: usize) -> Self {
        // ---
        Self {
            planned,
            ..Self::default()
        }
    }

    pub fn record(&mut self, event: &EmailEvent) {
        // ---
        self.emitted += 1;
        *self
            .by_provider
            .entry(event.provider.clone())
            .or_default()
            .entry(event.status)
            .or_insert(0) += event.count;
    }

    /// Sum of counts across providers for one status.
    pub fn total(&self, status: EmailStatus) -> u64 {
        // ---
        self.by_provider
            .values()
            .filter_map(|statuses| statuses.get(&status))
            .sum()
    }

    /// JSON rendering used in the batch log line.
    pub fn provider_breakdown(&self) -> Value {
        // ---
        let providers: Map<String, Value> = self
            .by_provider
            .iter()
            .map(|(provider, statuses)| {
                let counts: Map<String, Value> = statuses
                    .iter()
                    .map(|(status, count)| (status.as_str().to_string(), json!(count)))
                    .collect();
                (provider.clone(), Value::Object(counts))
            })
            .collect();
        Value::Object(providers)
    }
}
