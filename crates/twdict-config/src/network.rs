use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_timeout_seconds() -> u64 {
    30
}

fn default_page_timeout_seconds() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

/// Settings for talking to the publisher. Only the fetcher retries.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for an archive download
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Timeout for the download page used to probe the latest version
    #[serde(default = "default_page_timeout_seconds")]
    pub page_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay, doubled on each further attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl NetworkConfig {
    pub fn new() -> Self {
        let timeout_seconds = env::var("TWDICT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_timeout_seconds);

        let max_retries = env::var("TWDICT_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_retries);

        Self {
            timeout_seconds,
            max_retries,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_seconds)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            page_timeout_seconds: default_page_timeout_seconds(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}
