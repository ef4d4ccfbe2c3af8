//! Time-of-day traffic shaping.
//!
//! Batch size is `base * multiplier(hour)`, where `base` is drawn from the
//! configured batch range and the multiplier is a step function of the hour
//! with uniform jitter inside each bracket.

use rand::Rng;

use crate::config::{BatchConfig, TrafficBracket};

/// Hour-of-day multiplier curve plus the base batch range it scales.
#[derive(Debug, Clone)]
pub struct TrafficProfile {
    // ---
    brackets: Vec<TrafficBracket>,
    batch: BatchConfig,
}

/// Outcome of sizing one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPlan {
    pub hour: u32,
    pub base: u32,
    pub multiplier: f64,
    pub size: usize,
}

impl TrafficProfile {
    // ---
    /// Brackets are expected to be validated (contiguous over 0..24).
    pub fn new(brackets: Vec<TrafficBracket>, batch: BatchConfig) -> Self {
        // ---
        Self { brackets, batch }
    }

    /// Multiplier for `hour` (taken modulo 24).
    ///
    /// An hour no bracket covers scales by 1.0.
    pub fn multiplier<R: Rng + ?Sized>(&self, hour: u32, rng: &mut R) -> f64 {
        // ---
        let hour = hour % 24;
        self.brackets
            .iter()
            .find(|b| b.start_hour <= hour && hour < b.end_hour)
            .map(|b| b.min + rng.gen::<f64>() * (b.max - b.min))
            .unwrap_or(1.0)
    }

    /// Draws the base size first, then the multiplier, so two RNGs in the
    /// same state produce the same base for different hours.
    pub fn plan_batch<R: Rng + ?Sized>(&self, hour: u32, rng: &mut R) -> BatchPlan {
        // ---
        let base = rng.gen_range(self.batch.base_min..self.batch.base_max);
        let multiplier = self.multiplier(hour, rng);
        let size = (f64::from(base) * multiplier) as usize;
        BatchPlan {
            hour: hour % 24,
            base,
            multiplier,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::GeneratorConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_profile() -> TrafficProfile {
        // ---
        let config = GeneratorConfig::default();
        TrafficProfile::new(config.traffic, config.batch)
    }

    #[test]
    fn multiplier_stays_inside_bracket() {
        // ---
        let profile = default_profile();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1_000 {
            let night = profile.multiplier(3, &mut rng);
            assert!((0.2..=0.5).contains(&night), "night {night}");

            let peak = profile.multiplier(10, &mut rng);
            assert!((1.2..=2.0).contains(&peak), "peak {peak}");

            let late = profile.multiplier(23, &mut rng);
            assert!((0.3..=0.7).contains(&late), "late {late}");
        }
    }

    #[test]
    fn hours_wrap_modulo_day() {
        // ---
        let profile = default_profile();
        let mut rng = StdRng::seed_from_u64(2);
        let m = profile.multiplier(24 + 10, &mut rng);
        assert!((1.2..=2.0).contains(&m));
    }

    #[test]
    fn peak_batches_exceed_night_batches_for_identical_base_draws() {
        // ---
        let profile = default_profile();
        for seed in 0..500 {
            let peak = profile.plan_batch(10, &mut StdRng::seed_from_u64(seed));
            let night = profile.plan_batch(3, &mut StdRng::seed_from_u64(seed));
            assert_eq!(peak.base, night.base);
            assert!(peak.size > night.size, "seed {seed}: {peak:?} vs {night:?}");
        }
    }

    #[test]
    fn peak_batches_are_larger_on_average() {
        // ---
        let profile = default_profile();
        let mut rng = StdRng::seed_from_u64(77);
        let trials = 2_000;

        let mean = |hour: u32, rng: &mut StdRng| {
            (0..trials)
                .map(|_| profile.plan_batch(hour, rng).size as f64)
                .sum::<f64>()
                / trials as f64
        };

        let peak = mean(10, &mut rng);
        let night = mean(3, &mut rng);
        assert!(peak > night * 2.0, "peak {peak} night {night}");
    }

    #[test]
    fn base_stays_in_configured_range() {
        // ---
        let profile = default_profile();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..1_000 {
            let plan = profile.plan_batch(12, &mut rng);
            assert!((20..100).contains(&plan.base));
        }
    }
}
