use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::app::BackendConfig;
use crate::chat::input::InputControl;
use crate::chat::transcript::{sanitize_text, Role, TranscriptSink, TypingMarker};
use crate::client::{ChatBackend, HealthStatus};
use crate::error::Error;

/// Bot reply shown for every failed submission, whatever the cause.
pub fn backend_error_message(api_base: &str) -> String {
    format!(
        "Sorry, I encountered an error. Please make sure the backend server is running on {}",
        api_base
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// Why a submission failed. Logged for diagnostics; the user only ever sees
/// the generic error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Status(u16),
    Decode,
    Timeout,
}

impl From<&Error> for FailureKind {
    fn from(error: &Error) -> Self {
        match error {
            Error::Status { status, .. } => FailureKind::Status(*status),
            Error::Decode(_) | Error::Json(_) => FailureKind::Decode,
            Error::Timeout(_) => FailureKind::Timeout,
            Error::Http(e) if e.is_timeout() => FailureKind::Timeout,
            Error::Http(e) if e.is_decode() => FailureKind::Decode,
            _ => FailureKind::Transport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty or whitespace-only input; nothing happened.
    Ignored,
    /// Another submission is still awaiting its reply; nothing happened.
    Busy,
    Replied,
    Failed(FailureKind),
}

#[derive(Debug, Clone)]
pub struct ChatSessionConfig {
    pub request_timeout: Duration,
}

impl Default for ChatSessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&BackendConfig> for ChatSessionConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
        }
    }
}

/// Drives one chat: user text in, one backend call out, transcript and
/// input state kept consistent whatever the call does.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    transcript: Arc<dyn TranscriptSink>,
    input: Arc<dyn InputControl>,
    config: ChatSessionConfig,
    in_flight: AtomicBool,
}

/// Holds the "request in flight" state. Dropping it removes the typing
/// indicator if one is still shown, then re-enables input and returns
/// focus. This runs on every exit path, including unwinding and the
/// `submit` future being dropped mid-request.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    input: &'a dyn InputControl,
    transcript: &'a dyn TranscriptSink,
    typing: Option<TypingMarker>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(
        in_flight: &'a AtomicBool,
        input: &'a dyn InputControl,
        transcript: &'a dyn TranscriptSink,
    ) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        input.set_enabled(false);
        Some(Self {
            in_flight,
            input,
            transcript,
            typing: None,
        })
    }

    fn show_typing(&mut self) {
        if self.typing.is_none() {
            self.typing = Some(self.transcript.show_typing());
        }
    }

    fn hide_typing(&mut self) {
        if let Some(marker) = self.typing.take() {
            self.transcript.hide_typing(marker);
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.typing.is_some() {
            warn!("Submission abandoned before settling; removing typing indicator");
            self.hide_typing();
        }
        self.input.set_enabled(true);
        self.input.focus();
        self.in_flight.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        transcript: Arc<dyn TranscriptSink>,
        input: Arc<dyn InputControl>,
        config: ChatSessionConfig,
    ) -> Self {
        info!(
            "Creating chat session for {} (timeout {:?})",
            backend.base_url(),
            config.request_timeout
        );

        Self {
            backend,
            transcript,
            input,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.in_flight.load(Ordering::Acquire) {
            SessionState::AwaitingResponse
        } else {
            SessionState::Idle
        }
    }

    pub fn error_message(&self) -> String {
        backend_error_message(self.backend.base_url())
    }

    /// Submits the current input text. Never fails: every error ends as a
    /// bot entry in the transcript and the returned outcome.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        // Sanitize first so text made only of control characters counts as empty.
        let sanitized = sanitize_text(text);
        let message = sanitized.trim();
        if message.is_empty() {
            debug!("Ignoring empty submission");
            return SubmitOutcome::Ignored;
        }

        let Some(mut guard) = InFlightGuard::acquire(
            &self.in_flight,
            self.input.as_ref(),
            self.transcript.as_ref(),
        ) else {
            warn!("Submission rejected: a request is already in flight");
            return SubmitOutcome::Busy;
        };

        self.transcript.append(Role::User, message);
        self.input.clear();
        guard.show_typing();

        let start_time = Instant::now();
        let request = self.backend.send_message(message);
        let result = match timeout(self.config.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.config.request_timeout)),
        };

        guard.hide_typing();

        match result {
            Ok(reply) => {
                debug!("Reply received in {:?}", start_time.elapsed());
                self.transcript.append(Role::Bot, &reply);
                SubmitOutcome::Replied
            }
            Err(e) => {
                let kind = FailureKind::from(&e);
                error!("Chat request failed ({:?}): {}", kind, e);
                self.transcript.append(Role::Bot, &self.error_message());
                SubmitOutcome::Failed(kind)
            }
        }
    }

    /// Fire-and-forget `GET /health`. The result is only logged; nothing in
    /// the session waits on it.
    pub fn check_backend_health(&self) -> JoinHandle<HealthStatus> {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move { observe_health(backend.as_ref()).await })
    }
}

/// Runs a health check and logs what it found.
pub async fn observe_health(backend: &dyn ChatBackend) -> HealthStatus {
    let status = match backend.health_check().await {
        Ok(status) => status,
        Err(e) => HealthStatus::unhealthy(None, e.to_string()),
    };

    if status.is_healthy {
        info!(
            "Backend is running at {} ({}ms)",
            backend.base_url(),
            status.response_time_ms.unwrap_or_default()
        );
        if status.llm_enabled == Some(false) {
            warn!("Backend LLM is not configured; replies will be retrieval only");
        }
    } else {
        warn!(
            "Backend not reachable at {}: {}",
            backend.base_url(),
            status.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    status
}
