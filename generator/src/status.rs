//! Delivery status, per-provider status rates and count ranges.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::weighted::{TableError, WeightedTable};

/// Email delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Sent,
    InTransit,
    Bounced,
    Rejected,
}

impl EmailStatus {
    // ---
    pub const ALL: [EmailStatus; 4] = [
        EmailStatus::Sent,
        EmailStatus::InTransit,
        EmailStatus::Bounced,
        EmailStatus::Rejected,
    ];

    /// Label value used in metrics and logs.
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::InTransit => "in_transit",
            EmailStatus::Bounced => "bounced",
            EmailStatus::Rejected => "rejected",
        }
    }

    /// Dense index, stable across releases (matches `ALL`).
    pub fn index(self) -> usize {
        // ---
        self as usize
    }

    /// Half-open `[low, low + span)` count range for a provider base volume.
    ///
    /// Both bounds are clamped so every status yields at least 1, even for
    /// a base volume of 0 or 1.
    pub fn count_range(self, base_volume: u32) -> (u64, u64) {
        // ---
        let base = u64::from(base_volume);
        let (low, span) = match self {
            EmailStatus::Sent => (base, base * 2),
            EmailStatus::InTransit => (base / 4, base / 2),
            EmailStatus::Bounced => (base / 8, base / 4),
            EmailStatus::Rejected => (1, base / 8),
        };
        (low.max(1), span.max(1))
    }

    /// Draws an event count for this status.
    pub fn sample_count<R: Rng + ?Sized>(self, base_volume: u32, rng: &mut R) -> u64 {
        // ---
        let (low, span) = self.count_range(base_volume);
        low + rng.gen_range(0..span)
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-provider status distribution.
///
/// Selection is normalized by the actual sum of the rates, so a table that
/// sums to 0.97 or 1.03 is not biased toward whichever status comes last.
/// When nothing qualifies the designated fallback status is returned.
#[derive(Debug, Clone)]
pub struct StatusRates {
    // ---
    table: WeightedTable<EmailStatus>,
    fallback: EmailStatus,
}

impl StatusRates {
    // ---
    pub fn new(
        rates: Vec<(EmailStatus, f64)>,
        fallback: EmailStatus,
    ) -> Result<Self, TableError> {
        // ---
        Ok(Self {
            table: WeightedTable::new(rates)?,
            fallback,
        })
    }

    /// Sum of the configured rates (ideally ~1.0).
    pub fn total(&self) -> f64 {
        // ---
        self.table.total()
    }

    pub fn fallback(&self) -> EmailStatus {
        // ---
        self.fallback
    }

    /// Deterministic selection for `r` in `[0, total)`.
    pub fn pick(&self, r: f64) -> EmailStatus {
        // ---
        self.table.try_pick(r).copied().unwrap_or(self.fallback)
    }

    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> EmailStatus {
        // ---
        let r = rng.gen_range(0.0..self.table.total());
        self.pick(r)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gmail_rates() -> StatusRates {
        // ---
        StatusRates::new(
            vec![
                (EmailStatus::Sent, 0.85),
                (EmailStatus::InTransit, 0.08),
                (EmailStatus::Bounced, 0.05),
                (EmailStatus::Rejected, 0.02),
            ],
            EmailStatus::Sent,
        )
        .expect("valid rates")
    }

    #[test]
    fn pick_walks_rates_in_configured_order() {
        // ---
        let rates = gmail_rates();
        assert_eq!(rates.pick(0.10), EmailStatus::Sent);
        assert_eq!(rates.pick(0.85), EmailStatus::Sent);
        assert_eq!(rates.pick(0.90), EmailStatus::InTransit);
        assert_eq!(rates.pick(0.95), EmailStatus::Bounced);
        assert_eq!(rates.pick(0.99), EmailStatus::Rejected);
    }

    #[test]
    fn overflow_returns_designated_fallback() {
        // ---
        let rates = StatusRates::new(
            vec![(EmailStatus::Bounced, 0.5), (EmailStatus::Rejected, 0.5)],
            EmailStatus::Sent,
        )
        .unwrap();
        assert_eq!(rates.pick(1.5), EmailStatus::Sent);
    }

    #[test]
    fn under_summed_rates_are_normalized() {
        // ---
        // Sums to 0.5: without normalization "rejected" would absorb half
        // of all draws.
        let rates = StatusRates::new(
            vec![(EmailStatus::Sent, 0.4), (EmailStatus::Rejected, 0.1)],
            EmailStatus::Sent,
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let n = 50_000;
        let rejected = (0..n)
            .filter(|_| rates.select(&mut rng) == EmailStatus::Rejected)
            .count();
        let share = rejected as f64 / n as f64;
        assert!((share - 0.2).abs() < 0.02, "rejected share {share}");
    }

    #[test]
    fn counts_are_at_least_one_for_every_base_volume() {
        // ---
        let mut rng = StdRng::seed_from_u64(11);
        for base in [0u32, 1, 2, 3, 7, 8, 20, 100] {
            for status in EmailStatus::ALL {
                for _ in 0..200 {
                    let count = status.sample_count(base, &mut rng);
                    assert!(count >= 1, "{status} base={base} gave {count}");
                }
            }
        }
    }

    #[test]
    fn count_ranges_scale_with_base_volume() {
        // ---
        assert_eq!(EmailStatus::Sent.count_range(100), (100, 200));
        assert_eq!(EmailStatus::InTransit.count_range(100), (25, 50));
        assert_eq!(EmailStatus::Bounced.count_range(100), (12, 25));
        assert_eq!(EmailStatus::Rejected.count_range(100), (1, 12));

        // Rejected is [1, base/8] inclusive.
        let mut rng = StdRng::seed_from_u64(5);
        let max = (0..5_000)
            .map(|_| EmailStatus::Rejected.sample_count(100, &mut rng))
            .max()
            .unwrap();
        assert_eq!(max, 12);
    }

    #[test]
    fn status_serializes_as_snake_case() {
        // ---
        let json = serde_json::to_string(&EmailStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
        assert_eq!(EmailStatus::InTransit.to_string(), "in_transit");
    }
}
