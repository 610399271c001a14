use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Identifies the one live typing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypingMarker(Uuid);

impl TypingMarker {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(MessageEntry),
    Typing(TypingMarker),
}

impl Entry {
    pub fn as_message(&self) -> Option<&MessageEntry> {
        match self {
            Entry::Message(message) => Some(message),
            Entry::Typing(_) => None,
        }
    }
}

/// Append-only list of chat entries. The typing indicator is the only entry
/// that is ever removed, and at most one exists at a time.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&mut self, role: Role, text: impl Into<String>) {
        self.entries.push(Entry::Message(MessageEntry::new(role, text)));
    }

    /// Appends the typing indicator, or returns the existing one.
    pub fn push_typing(&mut self) -> TypingMarker {
        if let Some(marker) = self.typing_marker() {
            return marker;
        }
        let marker = TypingMarker::new();
        self.entries.push(Entry::Typing(marker));
        marker
    }

    /// Returns false when the marker is not (or no longer) present.
    pub fn remove_typing(&mut self, marker: TypingMarker) -> bool {
        match self
            .entries
            .iter()
            .position(|entry| *entry == Entry::Typing(marker))
        {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn typing_marker(&self) -> Option<TypingMarker> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Typing(marker) => Some(*marker),
            Entry::Message(_) => None,
        })
    }

    pub fn has_typing(&self) -> bool {
        self.typing_marker().is_some()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter().filter_map(Entry::as_message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the session controller writes transcript changes.
pub trait TranscriptSink: Send + Sync {
    fn append(&self, role: Role, text: &str);
    fn show_typing(&self) -> TypingMarker;
    fn hide_typing(&self, marker: TypingMarker) -> bool;
}

/// Transcript shared between the session task and the renderer.
#[derive(Debug, Clone, Default)]
pub struct SharedTranscript {
    inner: Arc<RwLock<Transcript>>,
}

impl SharedTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a read-locked view of the transcript.
    pub fn read<R>(&self, f: impl FnOnce(&Transcript) -> R) -> R {
        f(&self.inner.read())
    }
}

impl TranscriptSink for SharedTranscript {
    fn append(&self, role: Role, text: &str) {
        self.inner.write().push_message(role, sanitize_text(text));
    }

    fn show_typing(&self) -> TypingMarker {
        self.inner.write().push_typing()
    }

    fn hide_typing(&self, marker: TypingMarker) -> bool {
        self.inner.write().remove_typing(marker)
    }
}

/// Strips characters that a terminal would interpret instead of print.
/// Newlines and tabs survive; tabs become four spaces.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push_str("    "),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
            }
            '\u{1b}' => skip_escape_sequence(&mut chars),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

// ESC [ ... final byte (CSI) and ESC ] ... BEL/ST (OSC) are dropped whole.
fn skip_escape_sequence(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    match chars.peek() {
        Some('[') => {
            chars.next();
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
        Some(']') => {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '\u{7}' {
                    break;
                }
                if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        Some(_) => {
            chars.next();
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_order() {
        let mut transcript = Transcript::new();
        transcript.push_message(Role::User, "hi");
        transcript.push_message(Role::Bot, "hello");

        let texts: Vec<_> = transcript.messages().map(|m| (m.role, m.text.as_str())).collect();
        assert_eq!(texts, vec![(Role::User, "hi"), (Role::Bot, "hello")]);
    }

    #[test]
    fn test_typing_indicator_is_singleton() {
        let mut transcript = Transcript::new();
        let first = transcript.push_typing();
        let second = transcript.push_typing();

        assert_eq!(first, second);
        assert_eq!(transcript.len(), 1);
        assert!(transcript.has_typing());
    }

    #[test]
    fn test_remove_typing_only_once() {
        let mut transcript = Transcript::new();
        transcript.push_message(Role::User, "ping");
        let marker = transcript.push_typing();

        assert!(transcript.remove_typing(marker));
        assert!(!transcript.remove_typing(marker));
        assert!(!transcript.has_typing());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_stale_marker_does_not_remove_new_indicator() {
        let mut transcript = Transcript::new();
        let old = transcript.push_typing();
        transcript.remove_typing(old);
        let current = transcript.push_typing();

        assert_ne!(old, current);
        assert!(!transcript.remove_typing(old));
        assert!(transcript.has_typing());
    }

    #[test]
    fn test_shared_transcript_sanitizes() {
        let shared = SharedTranscript::new();
        shared.append(Role::Bot, "\u{1b}[31mred\u{1b}[0m text");

        let text = shared.read(|t| t.messages().next().map(|m| m.text.clone()));
        assert_eq!(text.as_deref(), Some("red text"));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("plain <b>markup</b>"), "plain <b>markup</b>");
        assert_eq!(sanitize_text("line1\r\nline2\rline3"), "line1\nline2\nline3");
        assert_eq!(sanitize_text("a\tb"), "a    b");
        assert_eq!(sanitize_text("bell\u{7}less"), "bellless");
        assert_eq!(sanitize_text("\u{1b}]0;title\u{7}after"), "after");
        assert_eq!(sanitize_text("\u{1b}]8;;http://x\u{1b}\\link"), "link");
        assert_eq!(sanitize_text("trailing\u{1b}"), "trailing");
    }
}
