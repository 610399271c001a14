pub mod http;
pub mod provider;

pub use http::{parse_reply, HttpChatBackend};
pub use provider::{ChatBackend, ChatReply, ChatRequest, HealthReport, HealthStatus};
