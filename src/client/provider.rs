use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The remote chat service as seen by the session controller.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one user message and returns the reply text.
    async fn send_message(&self, message: &str) -> Result<String>;
    async fn health_check(&self) -> Result<HealthStatus>;
    fn base_url(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of a successful `POST /chat`. The field is kept loose so a missing or
/// mistyped `response` becomes a decode error instead of a serde failure with
/// no context.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub llm_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub last_check: DateTime<Utc>,
    pub response_time_ms: Option<u64>,
    pub status_code: Option<u16>,
    pub llm_enabled: Option<bool>,
    pub error_message: Option<String>,
}

impl HealthStatus {
    pub fn healthy(status_code: u16, response_time_ms: u64, report: HealthReport) -> Self {
        Self {
            is_healthy: true,
            last_check: Utc::now(),
            response_time_ms: Some(response_time_ms),
            status_code: Some(status_code),
            llm_enabled: report.llm_enabled,
            error_message: None,
        }
    }

    pub fn unhealthy(status_code: Option<u16>, error: String) -> Self {
        Self {
            is_healthy: false,
            last_check: Utc::now(),
            response_time_ms: None,
            status_code,
            llm_enabled: None,
            error_message: Some(error),
        }
    }
}
