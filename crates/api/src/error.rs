use thiserror::Error;

/// Failures talking to the workflow server.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("[{status}] {body}")]
    Status { status: u16, body: String },
    #[error("start response did not include a handler_id")]
    MissingHandlerId,
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("result for run {run_id} not ready after {attempts} attempts")]
    ResultNotReady { run_id: String, attempts: u32 },
}

impl ApiError {
    pub fn invalid_base_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    /// Returns `true` for failures that happened before the server answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
