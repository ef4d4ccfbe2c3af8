//! Weighted email event sampler.
//!
//! `EventSampler` owns every table it draws from, its RNG and the running
//! totals. Nothing here touches global state, so tests build samplers with
//! a fixed seed and compare runs.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{ConfigError, GeneratorConfig, IntervalConfig, WeightedLabel};
use crate::event::{event_id, EmailEvent};
use crate::status::StatusRates;
use crate::totals::RunningTotals;
use crate::traffic::TrafficProfile;
use crate::weighted::WeightedTable;

/// Status rate sums further than this from 1.0 are logged at construction.
const RATE_SUM_TOLERANCE: f64 = 0.01;

/// A provider as the sampler sees it: configuration resolved into tables.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    // ---
    pub name: String,
    pub base_volume: u32,
    pub processing_jitter_ms: u64,
    pub rates: StatusRates,
}

/// Generates synthetic email events from weighted configuration tables.
pub struct EventSampler {
    // ---
    providers: WeightedTable<ProviderProfile>,
    dcs: WeightedTable<String>,
    regions: WeightedTable<String>,
    states: WeightedTable<(u32, u32)>,
    pub(crate) traffic: TrafficProfile,
    processing_base_ms: u64,
    interval: IntervalConfig,
    pub(crate) rng: StdRng,
    pub(crate) totals: Arc<RunningTotals>,
}

impl EventSampler {
    // ---
    /// Builds a sampler seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration fails validation or any
    /// of its tables is empty, has a negative weight or sums to zero.
    pub fn new(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        // ---
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Builds a sampler whose draws are fully determined by `seed`.
    pub fn with_seed(config: &GeneratorConfig, seed: u64) -> Result<Self, ConfigError> {
        // ---
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &GeneratorConfig, rng: StdRng) -> Result<Self, ConfigError> {
        // ---
        config.validate()?;

        let mut providers = Vec::with_capacity(config.providers.len());
        for provider in &config.providers {
            let rates = StatusRates::new(
                provider
                    .status_rates
                    .iter()
                    .map(|rate| (rate.status, rate.rate))
                    .collect(),
                config.fallback_status,
            )
            .map_err(|e| ConfigError::table(format!("{} status_rates", provider.name), e))?;

            if (rates.total() - 1.0).abs() > RATE_SUM_TOLERANCE {
                warn!(
                    provider = %provider.name,
                    rate_sum = rates.total(),
                    "Status rates do not sum to 1, selection is normalised by the actual sum"
                );
            }

            providers.push((
                ProviderProfile {
                    name: provider.name.clone(),
                    base_volume: provider.base_volume,
                    processing_jitter_ms: provider.processing_jitter_ms,
                    rates,
                },
                provider.weight,
            ));
        }

        let states = WeightedTable::new(
            config
                .states
                .iter()
                .map(|bucket| ((bucket.min, bucket.max), bucket.weight))
                .collect(),
        )
        .map_err(|e| ConfigError::table("states", e))?;

        Ok(Self {
            providers: WeightedTable::new(providers)
                .map_err(|e| ConfigError::table("providers", e))?,
            dcs: label_table("dcs", &config.dcs)?,
            regions: label_table("regions", &config.regions)?,
            states,
            traffic: TrafficProfile::new(config.traffic.clone(), config.batch),
            processing_base_ms: config.processing.base_ms,
            interval: config.interval,
            rng,
            totals: Arc::new(RunningTotals::new()),
        })
    }

    /// Shared handle to the cumulative totals (for the health endpoint).
    pub fn totals(&self) -> Arc<RunningTotals> {
        // ---
        Arc::clone(&self.totals)
    }

    /// Iterates providers with their selection weights, in table order.
    pub fn providers(&self) -> impl Iterator<Item = (&ProviderProfile, f64)> {
        // ---
        self.providers.iter()
    }

    /// Samples one event.
    pub fn generate_event(&mut self) -> EmailEvent {
        // ---
        self.sample().0
    }

    /// Samples one event together with its simulated processing time.
    pub(crate) fn sample(&mut self) -> (EmailEvent, Duration) {
        // ---
        let provider = self.providers.select(&mut self.rng);
        let status = provider.rates.select(&mut self.rng);
        let count = status.sample_count(provider.base_volume, &mut self.rng);
        let processing = processing_time(self.processing_base_ms, provider, &mut self.rng);

        let dcs = self.dcs.select(&mut self.rng).clone();
        let region = self.regions.select(&mut self.rng).clone();
        let &(min, max) = self.states.select(&mut self.rng);
        let state = self.rng.gen_range(min..=max);

        let timestamp = Utc::now();
        let event = EmailEvent {
            id: event_id(timestamp, &mut self.rng),
            dcs,
            state,
            region,
            provider: provider.name.clone(),
            status,
            count,
            timestamp,
        };

        (event, processing)
    }

    /// Pause before the next batch, drawn from the configured interval.
    pub(crate) fn next_interval(&mut self) -> Duration {
        // ---
        Duration::from_millis(
            self.rng
                .gen_range(self.interval.min_ms..self.interval.max_ms),
        )
    }
}

fn label_table(
    dimension: &str,
    entries: &[WeightedLabel],
) -> Result<WeightedTable<String>, ConfigError> {
    // ---
    WeightedTable::new(
        entries
            .iter()
            .map(|entry| (entry.label.clone(), entry.weight))
            .collect(),
    )
    .map_err(|e| ConfigError::table(dimension, e))
}

/// `base_ms` plus uniform jitter in `[0, processing_jitter_ms)`.
fn processing_time<R: Rng + ?Sized>(
    base_ms: u64,
    provider: &ProviderProfile,
    rng: &mut R,
) -> Duration {
    // ---
    let jitter = match provider.processing_jitter_ms {
        0 => 0,
        max => rng.gen_range(0..max),
    };
    Duration::from_millis(base_ms + jitter)
}
