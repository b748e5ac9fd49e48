use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub stream: bool,
}

/// Non-streaming reply of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub done: bool,
    /// Total generation time reported by the server, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
}
