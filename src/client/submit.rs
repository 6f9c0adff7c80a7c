use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const SUBMIT_PATH: &str = "/api/udyam/step1";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";

/// What the submission endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    /// Whether the HTTP status was a success.
    pub accepted: bool,
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unreadable response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Sends one submission payload to the API.
pub trait SubmissionClient {
    fn submit(&self, payload: &Map<String, Value>) -> Result<ServerReply, TransportError>;
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    #[serde(default)]
    message: Option<String>,
}

/// Posts payloads as JSON to `<base>/api/udyam/step1`.
pub struct HttpSubmissionClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpSubmissionClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            endpoint: submission_endpoint(base_url),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SubmissionClient for HttpSubmissionClient {
    fn submit(&self, payload: &Map<String, Value>) -> Result<ServerReply, TransportError> {
        debug!("POST {} ({} members)", self.endpoint, payload.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .map_err(|source| TransportError::Request {
                url: self.endpoint.clone(),
                source,
            })?;

        let accepted = response.status().is_success();
        let body = response.text().map_err(|source| TransportError::Body {
            url: self.endpoint.clone(),
            source,
        })?;

        // Proxies and framework rejections may answer with plain text.
        let message = serde_json::from_str::<ReplyBody>(&body)
            .ok()
            .and_then(|reply| reply.message);

        Ok(ServerReply { accepted, message })
    }
}

pub fn submission_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), SUBMIT_PATH)
}
