//! HTTP probing of the monitored endpoint

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

use crate::errors::{MonitorError, Result};

/// Outcome of a single probe against the target endpoint.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// When the probe completed
    pub timestamp: DateTime<Utc>,

    /// Whether the response carried the expected status code
    pub success: bool,

    /// Status code of the response, if one was received
    pub status_code: Option<u16>,

    /// Human-readable description of the failure, if any
    pub detail: Option<String>,
}

/// Issues GET requests against a fixed target and classifies the outcome.
pub struct HttpProber {
    client: reqwest::Client,
    target_url: String,
    expected_status: u16,
}

impl HttpProber {
    /// Create a prober with a dedicated client honoring the probe timeout.
    pub fn new(target_url: String, expected_status: u16, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("uptime_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            target_url,
            expected_status,
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn expected_status(&self) -> u16 {
        self.expected_status
    }

    /// Probe the target once.
    ///
    /// Never fails: transport errors and unexpected status codes both come
    /// back as unsuccessful results with a populated detail.
    pub async fn probe(&self) -> ProbeResult {
        let outcome = self.client.get(&self.target_url).send().await;
        let timestamp = Utc::now();

        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() == self.expected_status {
                    debug!("Probe of {} succeeded with status {}", self.target_url, status);
                    ProbeResult {
                        timestamp,
                        success: true,
                        status_code: Some(status.as_u16()),
                        detail: None,
                    }
                } else {
                    debug!(
                        "Probe of {} returned status {} (expected {})",
                        self.target_url, status, self.expected_status
                    );
                    ProbeResult {
                        timestamp,
                        success: false,
                        status_code: Some(status.as_u16()),
                        detail: Some(status.to_string()),
                    }
                }
            }
            Err(e) => {
                debug!("Probe of {} failed: {}", self.target_url, e);
                ProbeResult {
                    timestamp,
                    success: false,
                    status_code: None,
                    detail: Some(e.to_string()),
                }
            }
        }
    }
}
