use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use leapchat::chat::{
    backend_error_message, ChatSession, ChatSessionConfig, FailureKind, InputControl, InputState,
    Role, SessionState, SharedTranscript, SubmitOutcome,
};
use leapchat::client::{ChatBackend, HttpChatBackend};
use leapchat::Error;

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn backend_for(addr: SocketAddr, timeout: Duration) -> HttpChatBackend {
    HttpChatBackend::with_base_url(format!("http://{}/", addr), timeout).unwrap()
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default();
    Json(json!({ "response": format!("You asked: {}", message) }))
}

#[tokio::test]
async fn test_chat_returns_response_field() {
    let addr = serve(Router::new().route("/chat", post(echo))).await;
    let backend = backend_for(addr, Duration::from_secs(5));

    let reply = backend.send_message("what is the PM course?").await.unwrap();
    assert_eq!(reply, "You asked: what is the PM course?");
}

#[tokio::test]
async fn test_chat_non_2xx_is_status_error() {
    let router = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let addr = serve(router).await;
    let backend = backend_for(addr, Duration::from_secs(5));

    let err = backend.send_message("hello").await.unwrap_err();
    match &err {
        Error::Status { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(FailureKind::from(&err), FailureKind::Status(500));
}

#[tokio::test]
async fn test_chat_missing_response_is_decode_error() {
    let router = Router::new().route(
        "/chat",
        post(|| async { Json(json!({ "answer": "wrong field" })) }),
    );
    let addr = serve(router).await;
    let backend = backend_for(addr, Duration::from_secs(5));

    let err = backend.send_message("hello").await.unwrap_err();
    assert_eq!(FailureKind::from(&err), FailureKind::Decode);
}

#[tokio::test]
async fn test_chat_refused_connection_is_transport_error() {
    // Reserve a port, then free it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = backend_for(addr, Duration::from_secs(5));
    let err = backend.send_message("hello").await.unwrap_err();
    assert_eq!(FailureKind::from(&err), FailureKind::Transport);
}

#[tokio::test]
async fn test_chat_slow_backend_times_out() {
    let router = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "response": "too late" }))
        }),
    );
    let addr = serve(router).await;
    let backend = backend_for(addr, Duration::from_millis(200));

    let err = backend.send_message("hello").await.unwrap_err();
    assert_eq!(FailureKind::from(&err), FailureKind::Timeout);
}

#[tokio::test]
async fn test_health_reports_llm_status() {
    let router = Router::new().route(
        "/health",
        get(|| async { Json(json!({ "status": "healthy", "llm_enabled": false })) }),
    );
    let addr = serve(router).await;
    let backend = backend_for(addr, Duration::from_secs(5));

    let status = backend.health_check().await.unwrap();
    assert!(status.is_healthy);
    assert_eq!(status.status_code, Some(200));
    assert_eq!(status.llm_enabled, Some(false));
}

#[tokio::test]
async fn test_health_unreachable_is_unhealthy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = backend_for(addr, Duration::from_secs(5));
    let status = backend.health_check().await.unwrap();
    assert!(!status.is_healthy);
    assert!(status.error_message.is_some());
}

fn session_for(
    backend: HttpChatBackend,
    request_timeout: Duration,
) -> (ChatSession, SharedTranscript, InputState) {
    let transcript = SharedTranscript::new();
    let input = InputState::new();
    let session = ChatSession::new(
        Arc::new(backend),
        Arc::new(transcript.clone()),
        Arc::new(input.clone()),
        ChatSessionConfig { request_timeout },
    );
    (session, transcript, input)
}

fn transcript_messages(transcript: &SharedTranscript) -> Vec<(Role, String)> {
    transcript.read(|t| t.messages().map(|m| (m.role, m.text.clone())).collect())
}

#[tokio::test]
async fn test_session_round_trip_over_http() {
    let addr = serve(Router::new().route("/chat", post(echo))).await;
    let (session, transcript, input) =
        session_for(backend_for(addr, Duration::from_secs(5)), Duration::from_secs(5));

    let outcome = session.submit("  fees?  ").await;

    assert_eq!(outcome, SubmitOutcome::Replied);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(input.is_enabled());
    assert!(input.take_clear_request());
    assert!(input.take_focus_request());
    assert!(!transcript.read(|t| t.has_typing()));
    assert_eq!(
        transcript_messages(&transcript),
        vec![
            (Role::User, "fees?".to_string()),
            (Role::Bot, "You asked: fees?".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_session_server_error_shows_generic_reply() {
    let router = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    );
    let addr = serve(router).await;
    let backend = backend_for(addr, Duration::from_secs(5));
    let api_base = backend.base_url().to_string();
    let (session, transcript, input) = session_for(backend, Duration::from_secs(5));

    let outcome = session.submit("hello").await;

    assert_eq!(outcome, SubmitOutcome::Failed(FailureKind::Status(503)));
    assert!(input.is_enabled());
    assert!(!transcript.read(|t| t.has_typing()));
    assert_eq!(
        transcript_messages(&transcript),
        vec![
            (Role::User, "hello".to_string()),
            (Role::Bot, backend_error_message(&api_base)),
        ]
    );
}

#[tokio::test]
async fn test_session_timeout_releases_input() {
    let router = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "response": "too late" }))
        }),
    );
    let addr = serve(router).await;
    let (session, transcript, input) = session_for(
        backend_for(addr, Duration::from_secs(10)),
        Duration::from_millis(200),
    );

    let outcome = session.submit("hello").await;

    assert_eq!(outcome, SubmitOutcome::Failed(FailureKind::Timeout));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(input.is_enabled());
    assert!(!transcript.read(|t| t.has_typing()));
    assert_eq!(transcript.read(|t| t.len()), 2);
}
