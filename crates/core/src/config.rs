use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_refresh_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Tuning knobs for the selection engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker threads used to refresh candidate criteria.
    pub refresh_threads: usize,
    /// Share of the general-case score taken from the criterion score.
    pub score_weight: f64,
    /// Share of the general-case score taken from recency.
    pub recency_weight: f64,
    /// Seed for the tie-break RNG; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_threads: default_refresh_threads(),
            score_weight: 0.6,
            recency_weight: 0.4,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            refresh_threads: env_usize("DDS_REFRESH_THREADS", defaults.refresh_threads).max(1),
            score_weight: env_f64("DDS_SCORE_WEIGHT", defaults.score_weight),
            recency_weight: env_f64("DDS_RECENCY_WEIGHT", defaults.recency_weight),
            rng_seed: env_opt("DDS_RNG_SEED").and_then(|v| v.parse().ok()),
        }
    }

    /// Same as the defaults but with a fixed tie-break seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Engine config:");
        tracing::info!("  refresh:   threads={}", self.refresh_threads);
        tracing::info!(
            "  weighting: score={}, recency={}",
            self.score_weight,
            self.recency_weight
        );
        tracing::info!(
            "  rng:       seed={}",
            self.rng_seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(entropy)".to_string())
        );
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "refresh_threads": self.refresh_threads,
            "score_weight": self.score_weight,
            "recency_weight": self.recency_weight,
            "rng_seed": self.rng_seed,
        })
    }
}
