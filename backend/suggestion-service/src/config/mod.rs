/// Configuration management for suggestion-service
///
/// Connection settings come from plain environment variables; engine and cache
/// tuning is read with `envy` under the `SUGGESTION_` / `SUGGESTION_CACHE_`
/// prefixes, falling back to the defaults below.
use crate::error::SuggestionError;
use crate::models::InteractionType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub engine: EngineConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Only required when the Postgres-backed stores are wired in
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

/// Scoring weights, candidate bounds and per-stage timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_mutual_weight")]
    pub mutual_weight: f64,
    #[serde(default = "default_interest_weight")]
    pub interest_weight: f64,
    #[serde(default = "default_content_weight")]
    pub content_weight: f64,

    /// Mutual count at which the mutual contribution saturates
    #[serde(default = "default_mutual_saturation")]
    pub mutual_saturation: f64,
    /// Interest score at which the interest contribution saturates
    #[serde(default = "default_interest_saturation")]
    pub interest_saturation: f64,

    #[serde(default = "default_mutual_candidate_limit")]
    pub mutual_candidate_limit: usize,
    #[serde(default = "default_interest_candidate_limit")]
    pub interest_candidate_limit: usize,
    #[serde(default = "default_max_interest_categories")]
    pub max_interest_categories: usize,
    #[serde(default = "default_connector_display_limit")]
    pub connector_display_limit: usize,

    #[serde(default = "default_interaction_lookback_days")]
    pub interaction_lookback_days: i64,
    #[serde(default = "default_interaction_types")]
    pub interaction_types: Vec<InteractionType>,

    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Drop users on either side of a block from the candidate set
    #[serde(default = "default_exclude_blocked")]
    pub exclude_blocked: bool,

    #[serde(default = "default_context_timeout_ms")]
    pub context_timeout_ms: u64,
    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,
    #[serde(default = "default_hydration_timeout_ms")]
    pub hydration_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_key_prefix")]
    pub key_prefix: String,
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_mutual_weight() -> f64 {
    0.4
}

fn default_interest_weight() -> f64 {
    0.3
}

fn default_content_weight() -> f64 {
    0.3
}

fn default_mutual_saturation() -> f64 {
    10.0
}

fn default_interest_saturation() -> f64 {
    5.0
}

fn default_mutual_candidate_limit() -> usize {
    100
}

fn default_interest_candidate_limit() -> usize {
    50
}

fn default_max_interest_categories() -> usize {
    10
}

fn default_connector_display_limit() -> usize {
    2
}

fn default_interaction_lookback_days() -> i64 {
    30
}

fn default_interaction_types() -> Vec<InteractionType> {
    vec![
        InteractionType::View,
        InteractionType::Like,
        InteractionType::Comment,
    ]
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

fn default_exclude_blocked() -> bool {
    true
}

fn default_context_timeout_ms() -> u64 {
    800
}

fn default_signal_timeout_ms() -> u64 {
    500
}

fn default_hydration_timeout_ms() -> u64 {
    500
}

fn default_cache_ttl_secs() -> u64 {
    600 // 10 分鐘
}

fn default_cache_key_prefix() -> String {
    "nova:cache:suggestions".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mutual_weight: default_mutual_weight(),
            interest_weight: default_interest_weight(),
            content_weight: default_content_weight(),
            mutual_saturation: default_mutual_saturation(),
            interest_saturation: default_interest_saturation(),
            mutual_candidate_limit: default_mutual_candidate_limit(),
            interest_candidate_limit: default_interest_candidate_limit(),
            max_interest_categories: default_max_interest_categories(),
            connector_display_limit: default_connector_display_limit(),
            interaction_lookback_days: default_interaction_lookback_days(),
            interaction_types: default_interaction_types(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            exclude_blocked: default_exclude_blocked(),
            context_timeout_ms: default_context_timeout_ms(),
            signal_timeout_ms: default_signal_timeout_ms(),
            hydration_timeout_ms: default_hydration_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_cache_ttl_secs(),
            key_prefix: default_cache_key_prefix(),
        }
    }
}

impl EngineConfig {
    const WEIGHT_TOLERANCE: f64 = 1e-6;

    /// Reject weightings that break score normalization.
    pub fn validate(&self) -> Result<(), SuggestionError> {
        let weights = [
            ("mutual_weight", self.mutual_weight),
            ("interest_weight", self.interest_weight),
            ("content_weight", self.content_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(SuggestionError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }

        let sum = self.mutual_weight + self.interest_weight + self.content_weight;
        if (sum - 1.0).abs() > Self::WEIGHT_TOLERANCE {
            return Err(SuggestionError::InvalidConfig(format!(
                "signal weights must sum to 1.0, got {sum}"
            )));
        }

        if !(self.mutual_saturation > 0.0 && self.interest_saturation > 0.0) {
            return Err(SuggestionError::InvalidConfig(
                "saturation points must be positive".to_string(),
            ));
        }

        if self.max_limit == 0 || self.default_limit > self.max_limit {
            return Err(SuggestionError::InvalidConfig(format!(
                "default_limit ({}) must be within 1..=max_limit ({})",
                self.default_limit, self.max_limit
            )));
        }

        if self.interaction_lookback_days <= 0 {
            return Err(SuggestionError::InvalidConfig(
                "interaction_lookback_days must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the caller's limit: default when absent, capped at `max_limit`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.interaction_lookback_days)
    }

    pub fn context_timeout(&self) -> Duration {
        Duration::from_millis(self.context_timeout_ms)
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }

    pub fn hydration_timeout(&self) -> Duration {
        Duration::from_millis(self.hydration_timeout_ms)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").ok(),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_connections),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").ok(),
        };

        let engine: EngineConfig = envy::prefixed("SUGGESTION_")
            .from_env()
            .context("Failed to read SUGGESTION_* engine settings")?;
        engine
            .validate()
            .context("Engine configuration rejected")?;

        let cache: CacheConfig = envy::prefixed("SUGGESTION_CACHE_")
            .from_env()
            .context("Failed to read SUGGESTION_CACHE_* settings")?;

        if cache.enabled && redis.url.is_none() {
            anyhow::bail!("SUGGESTION_CACHE_ENABLED requires REDIS_URL");
        }

        Ok(Config {
            database,
            redis,
            engine,
            cache,
        })
    }
}
