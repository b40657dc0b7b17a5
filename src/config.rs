use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::task::EffortWeights;
use crate::{clog_debug, Error, Result};

/// Default deadline for a run stuck in the feedback-waiting stage.
pub const DEFAULT_FEEDBACK_TIMEOUT_SECS: u64 = 300;

/// Default cooperative poll cadence while awaiting feedback.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds a run may sit in the feedback-waiting stage before the
    /// orchestrator surfaces a timeout to the caller.
    #[serde(default = "default_feedback_timeout_secs")]
    pub feedback_timeout_secs: u64,
    /// Milliseconds between bus polls while a run awaits feedback.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Effort weights used for critical-path computation.
    #[serde(default)]
    pub effort_weights: EffortWeights,
}

fn default_feedback_timeout_secs() -> u64 {
    DEFAULT_FEEDBACK_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feedback_timeout_secs: DEFAULT_FEEDBACK_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            effort_weights: EffortWeights::default(),
        }
    }
}

impl Config {
    pub fn conclave_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".conclave"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::conclave_dir()?.join("conclave.toml"))
    }

    pub fn feedback_timeout(&self) -> Duration {
        Duration::from_secs(self.feedback_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        clog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            clog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        clog_debug!(
            "Config loaded: feedback_timeout_secs={}, poll_interval_ms={}",
            config.feedback_timeout_secs,
            config.poll_interval_ms
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let conclave_dir = Self::conclave_dir()?;
        if !conclave_dir.exists() {
            clog_debug!("Creating conclave directory");
            fs::create_dir_all(&conclave_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        clog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
