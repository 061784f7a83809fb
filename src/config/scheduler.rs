//! Scheduler configuration structure and loaders.
//!
//! Configuration only seeds the initial admission bound; runtime changes go
//! through `Scheduler::update_concurrency` so a settings update never
//! requires a restart.

use serde::{Deserialize, Serialize};

/// Environment variable naming the initial concurrency bound.
const ENV_MAX_CONCURRENT: &str = "DOWNPOOL_MAX_CONCURRENT_DOWNLOADS";
/// Environment variable naming the per-job status history depth.
const ENV_STATUS_HISTORY: &str = "DOWNPOOL_STATUS_HISTORY";

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of downloads running at once.
    pub max_concurrent_downloads: usize,
    /// Transition records retained per job by the in-memory status sink.
    #[serde(default = "default_status_history")]
    pub status_history: usize,
}

fn default_status_history() -> usize {
    16
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            status_history: default_status_history(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be greater than 0".into());
        }
        if self.status_history == 0 {
            return Err("status_history must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment, reading `.env` first.
    /// Unset variables fall back to defaults.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();
        if let Ok(raw) = std::env::var(ENV_MAX_CONCURRENT) {
            cfg.max_concurrent_downloads = raw
                .parse()
                .map_err(|e| format!("{ENV_MAX_CONCURRENT}: {e}"))?;
        }
        if let Ok(raw) = std::env::var(ENV_STATUS_HISTORY) {
            cfg.status_history = raw.parse().map_err(|e| format!("{ENV_STATUS_HISTORY}: {e}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
