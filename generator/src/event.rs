//! Sampled email event record.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::status::EmailStatus;

/// One synthetic email-processing event.
///
/// Created at sample time, handed to the sink once and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailEvent {
    // ---
    /// `email_<unix-nanos>_<0..10000>`; unique in practice, not guaranteed.
    pub id: String,

    /// Data-center set.
    pub dcs: String,

    pub state: u32,
    pub region: String,
    pub provider: String,
    pub status: EmailStatus,

    /// Number of emails this event represents (always >= 1).
    pub count: u64,

    pub timestamp: DateTime<Utc>,
}

/// Builds a time-based id with a random suffix.
pub fn event_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    // ---
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
    format!("email_{}_{}", nanos, rng.gen_range(0..10_000))
}
