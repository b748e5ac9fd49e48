//! Blocking client for an Ollama-compatible local inference server.

pub mod messages;

use crate::model::{InferenceModel, ModelRequest, ModelResponse};
use messages::{GenerateRequest, GenerateResponse};
use std::time::Duration;

// defaults for the local server
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_VISION_MODEL: &str = "llava";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-oss:20b";

const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode reply from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Connection settings for one model on the server.
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Base address of the server, e.g. `http://localhost:11434`.
    pub endpoint: String,
    pub model: String,
    /// Whole-request timeout; `None` waits for as long as generation takes.
    pub timeout: Option<Duration>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            model: DEFAULT_VISION_MODEL.to_string(),
            timeout: None,
        }
    }
}

impl OllamaConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A named model served by the local inference server.
pub struct OllamaModel {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

impl OllamaModel {
    pub fn new(config: OllamaConfig) -> Result<Self, OllamaError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OllamaError::Client)?;

        Ok(Self {
            client,
            url: format!("{}{GENERATE_PATH}", config.endpoint.trim_end_matches('/')),
            model: config.model,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl InferenceModel for OllamaModel {
    type Error = OllamaError;

    fn name(&self) -> &str {
        &self.model
    }

    fn run(&mut self, request: ModelRequest) -> Result<ModelResponse, Self::Error> {
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt,
            images: request.images,
            stream: false,
        };

        let reply = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|source| OllamaError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().unwrap_or_default();
            log::error!("{} returned {status}", self.url);
            return Err(OllamaError::Status {
                url: self.url.clone(),
                status,
                body,
            });
        }

        let reply = reply
            .json::<GenerateResponse>()
            .map_err(|source| OllamaError::Decode {
                url: self.url.clone(),
                source,
            })?;

        if let Some(total) = reply.total_duration {
            log::debug!(
                "{} reports {:?} of generation time",
                self.model,
                Duration::from_nanos(total)
            );
        }

        Ok(ModelResponse {
            response: reply.response,
        })
    }
}
