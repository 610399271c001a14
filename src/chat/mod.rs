pub mod input;
pub mod session;
pub mod transcript;

pub use input::{InputControl, InputState};
pub use session::{
    backend_error_message, observe_health, ChatSession, ChatSessionConfig, FailureKind,
    SessionState, SubmitOutcome,
};
pub use transcript::{
    sanitize_text, Entry, MessageEntry, Role, SharedTranscript, Transcript, TranscriptSink,
    TypingMarker,
};
