use super::error::{PrefilterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default tick interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 4096;

/// Default byte distance kept around each pointer destination.
pub const DEFAULT_RADIUS: u64 = 2048;

/// Prefilter tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    /// Delay between ticks.
    pub interval_ms: u64,
    /// Half-width of the window kept around each pointer destination.
    pub radius: u64,
    /// Log filter applied by `init_logging`, e.g. "info" or "mamu_prefilter=debug".
    pub log_level: String,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            radius: DEFAULT_RADIUS,
            log_level: "info".to_string(),
        }
    }
}

impl PrefilterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PrefilterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(PrefilterError::Config("interval_ms must be greater than 0".to_string()));
        }
        if self.radius == 0 {
            return Err(PrefilterError::Config("radius must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
