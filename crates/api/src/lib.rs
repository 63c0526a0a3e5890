//! Workflow server client.
//!
//! This crate provides a small client for the workflow server's HTTP API:
//!
//! - Constructing an HTTP client from [`ConsoleConfig`]
//! - Validating the configured base URL for safety
//! - Starting runs, streaming their NDJSON events and retrieving results
//! - Listing workflows and handlers, and checking server health
//!
//! The primary entry point is [`WorkflowClient`], which also implements the
//! [`WorkflowBackend`] seam used by the run engine.
//!
//! # Example
//!
//! ```ignore
//! use flowwatch_api::WorkflowClient;
//! use flowwatch_types::ConsoleConfig;
//!
//! async fn names() -> Result<Vec<String>, flowwatch_api::ApiError> {
//!     let client = WorkflowClient::new(&ConsoleConfig::default())?;
//!     client.list_workflows().await
//! }
//! ```

mod backend;
mod error;

use std::time::Duration;

use async_trait::async_trait;
use flowwatch_types::{
    ConsoleConfig, HandlerInfo, HandlerList, HealthStatus, RunId, StartRunRequest, StartRunResponse, WorkflowList,
    WorkflowOutput,
};
use flowwatch_util::{redact_sensitive, truncate_for_summary};
use futures_util::StreamExt;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

pub use backend::{EventByteStream, WorkflowBackend};
pub use error::ApiError;

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for one workflow server.
///
/// Only the TCP connect timeout is set on the client itself. Short calls get
/// a per-request timeout; event streams stay open for as long as the server
/// keeps them open.
pub struct WorkflowClient {
    base_url: String,
    http: Client,
    user_agent: String,
    request_timeout: Duration,
    result_poll_attempts: u32,
    result_poll_interval: Duration,
}

enum ResultPoll {
    Ready(WorkflowOutput),
    Pending,
}

impl WorkflowClient {
    /// Construct a [`WorkflowClient`] from console configuration.
    ///
    /// Fails when the base URL does not pass [`validate_base_url`].
    pub fn new(config: &ConsoleConfig) -> Result<Self, ApiError> {
        validate_base_url(&config.base_url, config.allow_insecure_remote)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("flowwatch/{}; {}", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
            request_timeout: config.request_timeout(),
            result_poll_attempts: config.result_poll_attempts.max(1),
            result_poll_interval: config.result_poll_interval(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the workflows the server can run.
    pub async fn list_workflows(&self) -> Result<Vec<String>, ApiError> {
        let url = self.url(&["workflows"]);
        let list: WorkflowList = self.get_json(&url).await?;
        Ok(list.workflows)
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.url(&["health"]);
        self.get_json(&url).await
    }

    /// Every handler the server knows about, running or finished.
    pub async fn list_handlers(&self) -> Result<Vec<HandlerInfo>, ApiError> {
        let url = self.url(&["handlers"]);
        let list: HandlerList = self.get_json(&url).await?;
        Ok(list.handlers)
    }

    /// Build a request with the configured User-Agent.
    fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        debug!(target: "flowwatch_api", %url, %method, "building request");
        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .request(reqwest::Method::GET, url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| ApiError::network(url, error))?;
        read_json(url, response).await
    }

    async fn poll_result(&self, url: &str) -> Result<ResultPoll, ApiError> {
        let response = self
            .request(reqwest::Method::GET, url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| ApiError::network(url, error))?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(ResultPoll::Pending);
        }
        let body = response.text().await.map_err(|error| ApiError::network(url, error))?;
        if !status.is_success() {
            return Ok(ResultPoll::Ready(WorkflowOutput::http_error(status.as_u16(), &body)));
        }
        let value: Value = serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok(ResultPoll::Ready(WorkflowOutput::from_response_body(value)))
    }
}

#[async_trait]
impl WorkflowBackend for WorkflowClient {
    async fn start_run(&self, workflow: &str, start_event: &Value) -> Result<RunId, ApiError> {
        let url = self.url(&["workflows", workflow, "run-nowait"]);
        debug!(
            target: "flowwatch_api",
            workflow,
            start_event = %redact_sensitive(&start_event.to_string()),
            "starting workflow"
        );

        let response = self
            .request(reqwest::Method::POST, &url)
            .timeout(self.request_timeout)
            .json(&StartRunRequest::new(start_event))
            .send()
            .await
            .map_err(|error| ApiError::network(&url, error))?;
        let started: StartRunResponse = read_json(&url, response).await?;

        let run_id = started
            .handler_id
            .filter(|id| !id.trim().is_empty())
            .map(RunId::new)
            .ok_or(ApiError::MissingHandlerId)?;
        info!(target: "flowwatch_api", workflow, %run_id, "workflow started");
        Ok(run_id)
    }

    async fn open_events(&self, run_id: &RunId) -> Result<EventByteStream, ApiError> {
        let url = self.url(&["events", run_id.as_str()]);
        let response = self
            .request(reqwest::Method::GET, &url)
            .header(header::ACCEPT, NDJSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(|error| ApiError::network(&url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|error| ApiError::network(&url, error))?;
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(target: "flowwatch_api", %run_id, "event stream opened");
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|error| ApiError::network(&url, error)));
        Ok(stream.boxed())
    }

    async fn fetch_result(&self, run_id: &RunId) -> WorkflowOutput {
        let url = self.url(&["results", run_id.as_str()]);
        for attempt in 1..=self.result_poll_attempts {
            match self.poll_result(&url).await {
                Ok(ResultPoll::Ready(output)) => {
                    if let WorkflowOutput::Error { error, .. } = &output {
                        warn!(
                            target: "flowwatch_api",
                            %run_id,
                            error = %truncate_for_summary(error, 200),
                            "result retrieval failed"
                        );
                    }
                    return output;
                }
                Ok(ResultPoll::Pending) => {
                    debug!(target: "flowwatch_api", %run_id, attempt, "result not ready yet");
                    if attempt < self.result_poll_attempts {
                        tokio::time::sleep(self.result_poll_interval).await;
                    }
                }
                Err(error) => {
                    warn!(target: "flowwatch_api", %run_id, %error, "result retrieval failed");
                    return WorkflowOutput::transport_error(error);
                }
            }
        }

        let error = ApiError::ResultNotReady {
            run_id: run_id.to_string(),
            attempts: self.result_poll_attempts,
        };
        warn!(target: "flowwatch_api", %run_id, %error, "giving up on result");
        WorkflowOutput::transport_error(error)
    }
}

async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(|error| ApiError::network(url, error))?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS unless `allow_insecure_remote` is set
pub fn validate_base_url(base: &str, allow_insecure_remote: bool) -> Result<(), ApiError> {
    let parsed_base_url = Url::parse(base).map_err(|error| ApiError::invalid_base_url(base, error.to_string()))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| ApiError::invalid_base_url(base, "base URL must include a host"))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    match parsed_base_url.scheme() {
        "https" => Ok(()),
        "http" if allow_insecure_remote => Ok(()),
        scheme => Err(ApiError::invalid_base_url(
            base,
            format!("non-localhost hosts must use https; got '{scheme}://'"),
        )),
    }
}
