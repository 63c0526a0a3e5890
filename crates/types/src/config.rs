//! Console configuration shared by the API client and the command line.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base URL used when neither the config file nor the environment provide one.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Settings read from `config.json` and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Root URL of the workflow server.
    pub base_url: String,
    /// TCP connect timeout applied to every request.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for non-streaming calls. Event streams are never timed out.
    pub request_timeout_secs: u64,
    /// How many times `/results` is asked again while it answers `202 Accepted`.
    pub result_poll_attempts: u32,
    /// Pause between result polls.
    pub result_poll_interval_ms: u64,
    /// Allows plain `http` for hosts other than localhost.
    pub allow_insecure_remote: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            result_poll_attempts: 5,
            result_poll_interval_ms: 500,
            allow_insecure_remote: false,
        }
    }
}

impl ConsoleConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn result_poll_interval(&self) -> Duration {
        Duration::from_millis(self.result_poll_interval_ms)
    }
}
