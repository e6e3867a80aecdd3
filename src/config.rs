//! Configuration loading and validation for the monitor

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the endpoint being monitored
    pub target_url: String,

    /// Seconds between consecutive probes
    pub check_interval_seconds: u64,

    /// Per-probe HTTP timeout in seconds
    pub timeout_seconds: u64,

    /// Status code that counts as a successful probe
    pub expected_status_code: u16,

    /// Address the exposition server binds to
    pub listen_addr: String,

    /// Append-only file receiving evicted and drained failure records
    pub failure_log_path: PathBuf,

    /// How many failure records are held in memory before eviction
    pub max_resident_failures: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            check_interval_seconds: 0,
            timeout_seconds: 0,
            expected_status_code: 0,
            listen_addr: "0.0.0.0:8080".to_string(),
            failure_log_path: PathBuf::from("logs/monitoring.log"),
            max_resident_failures: 10,
        }
    }
}

impl Config {
    /// Read and parse the YAML configuration file.
    ///
    /// Missing fields deserialize to their defaults; required fields default
    /// to zero values that `validate` rejects.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let config: Config = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.target_url.is_empty() {
            return Err("target_url cannot be empty".to_string());
        }

        if self.check_interval_seconds == 0 {
            return Err("check_interval_seconds must be greater than 0".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("timeout_seconds must be greater than 0".to_string());
        }

        if self.expected_status_code == 0 {
            return Err("expected_status_code must be greater than 0".to_string());
        }

        if self.listen_addr.is_empty() {
            return Err("listen_addr cannot be empty".to_string());
        }

        if self.max_resident_failures == 0 {
            return Err("max_resident_failures must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Interval between probe cycles.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Timeout applied to each probe request.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
