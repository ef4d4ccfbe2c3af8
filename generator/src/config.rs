//! Generator configuration.
//!
//! Every table the sampler draws from is configuration. The defaults
//! reproduce the broadside email demo: six providers with market-share
//! weights, three data-center sets, four regions, and a day-shaped traffic
//! curve. A TOML file may override any subset of fields.
//!
//! ```toml
//! fallback_status = "sent"
//!
//! [batch]
//! base_min = 50
//! base_max = 250
//!
//! [[providers]]
//! name = "gmail"
//! weight = 45.0
//! base_volume = 100
//! processing_jitter_ms = 100
//! status_rates = [
//!     { status = "sent", rate = 0.85 },
//!     { status = "in_transit", rate = 0.08 },
//!     { status = "bounced", rate = 0.05 },
//!     { status = "rejected", rate = 0.02 },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::status::EmailStatus;
use crate::weighted::TableError;

/// Highest state value a bucket may produce.
pub const MAX_STATE: u32 = 99;

/// Upper bound for `processing.base_ms` and per-provider jitter.
pub const MAX_PROCESSING_MS: u64 = 60_000;

/// Upper bound for `batch.base_max`.
pub const MAX_BATCH_BASE: u32 = 100_000;

/// Upper bound for a traffic bracket's multiplier.
pub const MAX_MULTIPLIER: f64 = 100.0;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to render configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid {dimension} table: {source}")]
    Table {
        dimension: String,
        source: TableError,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    // ---
    pub(crate) fn table(dimension: impl Into<String>, source: TableError) -> Self {
        // ---
        ConfigError::Table {
            dimension: dimension.into(),
            source,
        }
    }
}

/// Root configuration for the generator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Status returned when a provider's rate table yields nothing.
    pub fallback_status: EmailStatus,

    pub service: ServiceConfig,
    pub batch: BatchConfig,
    pub interval: IntervalConfig,
    pub processing: ProcessingConfig,

    /// Providers in selection order.
    pub providers: Vec<ProviderConfig>,

    /// Data-center sets in selection order.
    pub dcs: Vec<WeightedLabel>,

    /// Regions in selection order.
    pub regions: Vec<WeightedLabel>,

    /// State buckets in selection order.
    pub states: Vec<StateBucket>,

    /// Hour-of-day traffic brackets, covering 0..24 without gaps.
    pub traffic: Vec<TrafficBracket>,
}

/// Service identity and HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,

    /// Bind address for `/metrics` and `/health`.
    pub metrics_bind: String,

    /// OTLP/gRPC collector for span export; spans stay local when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

/// Base batch size range, half-open `[base_min, base_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub base_min: u32,
    pub base_max: u32,
}

/// Pause between batches, half-open `[min_ms, max_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Simulated per-email processing time shared by all providers.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub base_ms: u64,
}

/// One email provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name: String,

    /// Selection weight (market share).
    pub weight: f64,

    /// Scales the per-status count ranges.
    pub base_volume: u32,

    /// Extra processing time drawn from `[0, processing_jitter_ms)`.
    #[serde(default = "default_processing_jitter_ms")]
    pub processing_jitter_ms: u64,

    /// Status distribution in selection order.
    pub status_rates: Vec<StatusRate>,
}

fn default_processing_jitter_ms() -> u64 {
    300
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StatusRate {
    pub status: EmailStatus,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WeightedLabel {
    pub label: String,
    pub weight: f64,
}

/// Inclusive state range selected with `weight`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StateBucket {
    pub min: u32,
    pub max: u32,
    pub weight: f64,
}

/// Traffic multiplier range for hours `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TrafficBracket {
    pub start_hour: u32,
    pub end_hour: u32,
    pub min: f64,
    pub max: f64,
}

impl GeneratorConfig {
    // ---
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // ---
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GeneratorConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        // ---
        Ok(toml::to_string_pretty(self)?)
    }

    /// Semantic checks serde cannot express.
    ///
    /// Table-level checks (empty, negative or all-zero weights) happen when
    /// the sampler builds its tables; this covers ranges and cross-field
    /// rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // ---
        if self.batch.base_min == 0 || self.batch.base_min >= self.batch.base_max {
            return Err(ConfigError::Invalid(format!(
                "batch range [{}, {}) must be non-empty and start at 1 or more",
                self.batch.base_min, self.batch.base_max
            )));
        }
        if self.batch.base_max > MAX_BATCH_BASE {
            return Err(ConfigError::Invalid(format!(
                "batch base_max {} exceeds {MAX_BATCH_BASE}",
                self.batch.base_max
            )));
        }
        if self.processing.base_ms > MAX_PROCESSING_MS {
            return Err(ConfigError::Invalid(format!(
                "processing base_ms {} exceeds {MAX_PROCESSING_MS}",
                self.processing.base_ms
            )));
        }

        if self.interval.min_ms >= self.interval.max_ms {
            return Err(ConfigError::Invalid(format!(
                "interval range [{}, {}) ms is empty",
                self.interval.min_ms, self.interval.max_ms
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(ConfigError::Invalid("provider with empty name".into()));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "provider {} listed twice",
                    provider.name
                )));
            }

            if provider.processing_jitter_ms > MAX_PROCESSING_MS {
                return Err(ConfigError::Invalid(format!(
                    "provider {} processing_jitter_ms {} exceeds {MAX_PROCESSING_MS}",
                    provider.name, provider.processing_jitter_ms
                )));
            }

            let mut statuses = std::collections::HashSet::new();
            for rate in &provider.status_rates {
                if !statuses.insert(rate.status) {
                    return Err(ConfigError::Invalid(format!(
                        "provider {} lists status {} twice",
                        provider.name, rate.status
                    )));
                }
            }
        }

        for bucket in &self.states {
            if bucket.min > bucket.max {
                return Err(ConfigError::Invalid(format!(
                    "state bucket {}..={} is inverted",
                    bucket.min, bucket.max
                )));
            }
            if bucket.max > MAX_STATE {
                return Err(ConfigError::Invalid(format!(
                    "state bucket {}..={} exceeds {MAX_STATE}",
                    bucket.min, bucket.max
                )));
            }
        }

        validate_traffic(&self.traffic)
    }
}

fn validate_traffic(brackets: &[TrafficBracket]) -> Result<(), ConfigError> {
    // ---
    let mut next_hour = 0;
    for bracket in brackets {
        if bracket.start_hour != next_hour || bracket.end_hour <= bracket.start_hour {
            return Err(ConfigError::Invalid(format!(
                "traffic bracket {}..{} must start at hour {} and be non-empty",
                bracket.start_hour, bracket.end_hour, next_hour
            )));
        }
        if !(bracket.min.is_finite() && bracket.max.is_finite())
            || bracket.min < 0.0
            || bracket.min > bracket.max
            || bracket.max > MAX_MULTIPLIER
        {
            return Err(ConfigError::Invalid(format!(
                "traffic bracket {}..{} has invalid multiplier range {}..{}",
                bracket.start_hour, bracket.end_hour, bracket.min, bracket.max
            )));
        }
        next_hour = bracket.end_hour;
    }

    if next_hour != 24 {
        return Err(ConfigError::Invalid(format!(
            "traffic brackets end at hour {next_hour}, expected 24"
        )));
    }
    Ok(())
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fallback_status: EmailStatus::Sent,
            service: ServiceConfig::default(),
            batch: BatchConfig::default(),
            interval: IntervalConfig::default(),
            processing: ProcessingConfig::default(),
            providers: default_providers(),
            dcs: weighted(&[("dcs1", 0.50), ("lsp", 0.30), ("lsh", 0.20)]),
            regions: weighted(&[
                ("us-east-1", 0.40),
                ("us-west-2", 0.25),
                ("eu-west-1", 0.20),
                ("ap-south-1", 0.15),
            ]),
            states: [(0, 0.30), (20, 0.25), (40, 0.20), (60, 0.15), (80, 0.10)]
                .into_iter()
                .map(|(state, weight)| StateBucket {
                    min: state,
                    max: state,
                    weight,
                })
                .collect(),
            traffic: default_traffic(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "broadside-email-service".to_string(),
            metrics_bind: "0.0.0.0:8088".to_string(),
            otlp_endpoint: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            base_min: 20,
            base_max: 100,
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            min_ms: 1_000,
            max_ms: 8_000,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { base_ms: 50 }
    }
}

fn weighted(entries: &[(&str, f64)]) -> Vec<WeightedLabel> {
    // ---
    entries
        .iter()
        .map(|(label, weight)| WeightedLabel {
            label: label.to_string(),
            weight: *weight,
        })
        .collect()
}

fn provider(
    name: &str,
    weight: f64,
    base_volume: u32,
    processing_jitter_ms: u64,
    [sent, in_transit, bounced, rejected]: [f64; 4],
) -> ProviderConfig {
    // ---
    ProviderConfig {
        name: name.to_string(),
        weight,
        base_volume,
        processing_jitter_ms,
        status_rates: vec![
            StatusRate {
                status: EmailStatus::Sent,
                rate: sent,
            },
            StatusRate {
                status: EmailStatus::InTransit,
                rate: in_transit,
            },
            StatusRate {
                status: EmailStatus::Bounced,
                rate: bounced,
            },
            StatusRate {
                status: EmailStatus::Rejected,
                rate: rejected,
            },
        ],
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    // ---
    vec![
        provider("gmail", 45.0, 100, 100, [0.85, 0.08, 0.05, 0.02]),
        provider("hotmail", 20.0, 60, 150, [0.82, 0.10, 0.06, 0.02]),
        provider("rediff", 12.0, 40, 200, [0.78, 0.12, 0.07, 0.03]),
        provider("yahoo", 10.0, 35, 120, [0.80, 0.11, 0.06, 0.03]),
        provider("outlook", 8.0, 30, 150, [0.83, 0.09, 0.05, 0.03]),
        provider("others", 5.0, 20, 300, [0.75, 0.15, 0.08, 0.02]),
    ]
}

fn default_traffic() -> Vec<TrafficBracket> {
    // ---
    [
        (0, 6, 0.2, 0.5),   // night
        (6, 9, 0.6, 1.0),   // morning ramp
        (9, 12, 1.2, 2.0),  // morning peak
        (12, 14, 0.8, 1.2), // lunch
        (14, 17, 1.1, 1.8), // afternoon peak
        (17, 20, 0.7, 1.2), // evening
        (20, 24, 0.3, 0.7), // late evening
    ]
    .into_iter()
    .map(|(start_hour, end_hour, min, max)| TrafficBracket {
        start_hour,
        end_hour,
        min,
        max,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn defaults_validate() {
        // ---
        let config = GeneratorConfig::default();
        config.validate().expect("defaults must be valid");
        assert_eq!(config.providers.len(), 6);
        assert_eq!(config.providers[0].name, "gmail");
        assert_eq!(config.fallback_status, EmailStatus::Sent);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        // ---
        let config: GeneratorConfig = toml::from_str(
            r#"
            [batch]
            base_min = 50
            base_max = 250

            [[regions]]
            label = "eu-central-1"
            weight = 1.0
            "#,
        )
        .expect("parses");

        config.validate().expect("valid");
        assert_eq!(config.batch.base_min, 50);
        assert_eq!(config.regions.len(), 1);
        assert_eq!(config.providers, GeneratorConfig::default().providers);
        assert_eq!(config.interval, IntervalConfig::default());
    }

    #[test]
    fn otlp_endpoint_is_optional() {
        // ---
        assert_eq!(GeneratorConfig::default().service.otlp_endpoint, None);

        let config: GeneratorConfig = toml::from_str(
            r#"
            [service]
            otlp_endpoint = "http://collector:4317"
            "#,
        )
        .expect("parses");
        assert_eq!(
            config.service.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
        assert_eq!(config.service.metrics_bind, "0.0.0.0:8088");

        let reparsed: GeneratorConfig =
            toml::from_str(&config.to_toml().expect("renders")).expect("reparses");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn provider_rates_parse_in_file_order() {
        // ---
        let config: GeneratorConfig = toml::from_str(
            r#"
            [[providers]]
            name = "fastmail"
            weight = 1.0
            base_volume = 10
            status_rates = [
                { status = "bounced", rate = 0.1 },
                { status = "sent", rate = 0.9 },
            ]
            "#,
        )
        .expect("parses");

        let rates = &config.providers[0].status_rates;
        assert_eq!(rates[0].status, EmailStatus::Bounced);
        assert_eq!(rates[1].status, EmailStatus::Sent);
        assert_eq!(config.providers[0].processing_jitter_ms, 300);
    }

    #[test]
    fn defaults_render_and_reparse() {
        // ---
        let config = GeneratorConfig::default();
        let rendered = config.to_toml().expect("renders");
        let reparsed: GeneratorConfig = toml::from_str(&rendered).expect("reparses");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn traffic_gaps_are_rejected() {
        // ---
        let mut config = GeneratorConfig::default();
        config.traffic.remove(3);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("traffic bracket"), "{err}");

        let mut config = GeneratorConfig::default();
        config.traffic.pop();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("expected 24"), "{err}");
    }

    #[test]
    fn bad_ranges_are_rejected() {
        // ---
        let mut config = GeneratorConfig::default();
        config.batch.base_min = 0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.interval = IntervalConfig {
            min_ms: 5_000,
            max_ms: 5_000,
        };
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.states[0].min = 10;
        config.states[0].max = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_values_are_rejected() {
        // ---
        let mut config = GeneratorConfig::default();
        config.processing.base_ms = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_ms"), "{err}");

        let mut config = GeneratorConfig::default();
        config.providers[3].processing_jitter_ms = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("yahoo"), "{err}");

        let mut config = GeneratorConfig::default();
        config.traffic[2].max = 1e12;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multiplier"), "{err}");

        let mut config = GeneratorConfig::default();
        config.states[4].max = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds 99"), "{err}");

        let mut config = GeneratorConfig::default();
        config.batch.base_max = MAX_BATCH_BASE + 1;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.processing.base_ms = MAX_PROCESSING_MS;
        config.states[4].max = MAX_STATE;
        config.traffic[2].max = MAX_MULTIPLIER;
        config.validate().expect("limits are inclusive");
    }

    #[test]
    fn duplicate_provider_is_rejected() {
        // ---
        let mut config = GeneratorConfig::default();
        let gmail = config.providers[0].clone();
        config.providers.push(gmail);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("listed twice"), "{err}");
    }

    #[test]
    fn missing_file_reports_path() {
        // ---
        let err = GeneratorConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
