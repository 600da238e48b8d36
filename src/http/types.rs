//! JSON bodies for the HTTP API

use serde::{Deserialize, Serialize};

/// Error body for 4xx/5xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("Invalid request", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("Internal server error", message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub browser: BrowserHealth,
    pub cache: CacheHealth,
    pub queue: QueueHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserHealth {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueHealth {
    pub in_flight: usize,
    pub queued: usize,
    pub concurrency: usize,
}
