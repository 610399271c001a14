use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::app::BackendConfig;
use crate::client::{ChatBackend, ChatReply, ChatRequest, HealthReport, HealthStatus};
use crate::error::{Error, Result};

/// reqwest-backed client for the course assistant's `/chat` and `/health`
/// endpoints.
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpChatBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Self::with_base_url(config.base_url(), config.request_timeout())
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn create_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Http(e)
        }
    }
}

/// Pulls the reply text out of a `/chat` body. Anything other than a JSON
/// object with a string `response` field is a decode error.
pub fn parse_reply(body: &str) -> Result<String> {
    let reply: ChatReply = serde_json::from_str(body)
        .map_err(|e| Error::decode(format!("invalid JSON body: {}", e)))?;

    match reply.response {
        Some(serde_json::Value::String(text)) => Ok(text),
        Some(other) => Err(Error::decode(format!(
            "field `response` is not a string: {}",
            other
        ))),
        None => Err(Error::decode("field `response` is missing")),
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send_message(&self, message: &str) -> Result<String> {
        let url = self.endpoint("chat");
        let request = ChatRequest::new(message);

        debug!("Sending chat request: url={}, chars={}", url, message.chars().count());
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .headers(self.create_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        debug!("Chat request completed in {:?}", start_time.elapsed());

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Backend error: {} - {}", status, error_text);
            return Err(Error::status(status.as_u16(), error_text));
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        parse_reply(&body)
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        let url = self.endpoint("health");
        let start_time = Instant::now();

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let status_code = response.status().as_u16();
                let response_time = start_time.elapsed().as_millis() as u64;
                // Any 2xx is healthy; the body is informational only.
                let report = response.json::<HealthReport>().await.unwrap_or_default();
                Ok(HealthStatus::healthy(status_code, response_time, report))
            }
            Ok(response) => {
                let status = response.status();
                warn!("Health check returned {}", status);
                Ok(HealthStatus::unhealthy(
                    Some(status.as_u16()),
                    format!("unexpected status {}", status),
                ))
            }
            Err(e) => Ok(HealthStatus::unhealthy(None, e.to_string())),
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
