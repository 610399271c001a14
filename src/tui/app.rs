use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use leapchat::chat::{ChatSession, InputState, SharedTranscript};

use crate::tui::{
    components::{ChatView, Component, ConnectionStatus, HelpPopup, InputBox, StatusBar},
    Event, Theme,
};

pub struct App {
    // Components
    chat_view: ChatView,
    input_box: InputBox,
    status_bar: StatusBar,
    help_popup: HelpPopup,

    // State
    theme: Theme,
    should_quit: bool,
    // Set between spawning a submission and hearing it settle
    submitting: bool,

    // Backend integration
    session: Arc<ChatSession>,
    event_sender: mpsc::UnboundedSender<Event>,
}

impl App {
    pub fn new(
        session: Arc<ChatSession>,
        transcript: SharedTranscript,
        input: InputState,
        event_sender: mpsc::UnboundedSender<Event>,
        theme: Theme,
        backend_url: &str,
        show_timestamps: bool,
    ) -> Self {
        Self {
            chat_view: ChatView::new(transcript, "NextLeap Course Assistant", show_timestamps),
            input_box: InputBox::new(input),
            status_bar: StatusBar::new(backend_url),
            help_popup: HelpPopup::new(),
            theme,
            should_quit: false,
            submitting: false,
            session,
            event_sender,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn handle_event(&mut self, event: Event) {
        // Help popup takes priority
        if self.help_popup.handle_event(&event) {
            return;
        }

        match event {
            Event::Tick => self.chat_view.tick(),
            Event::Resize(w, h) => debug!("Terminal resized to {}x{}", w, h),
            Event::Key(key) => self.handle_key(key),
            Event::SubmissionSettled(outcome) => {
                self.submitting = false;
                self.status_bar.record_outcome(outcome);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('q'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return;
            }
            (KeyCode::F(1), _) => {
                self.help_popup.toggle();
                return;
            }
            _ => {}
        }

        let event = Event::Key(key);
        if self.chat_view.handle_event(&event) || self.input_box.handle_event(&event) {
            return;
        }

        if key.code == KeyCode::Enter {
            self.submit_input();
        }
    }

    /// Hands the current input to the session on a background task so the
    /// screen keeps drawing while the reply is pending.
    fn submit_input(&mut self) {
        if self.submitting || !self.input_box.is_enabled() {
            return;
        }

        let content = self.input_box.content();
        if content.trim().is_empty() {
            return;
        }

        self.submitting = true;
        self.status_bar.set_status("Waiting for response...");
        self.status_bar.set_connection_status(ConnectionStatus::Sending);

        let session = Arc::clone(&self.session);
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let outcome = session.submit(&content).await;
            let _ = sender.send(Event::SubmissionSettled(outcome));
        });
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Chat view
                Constraint::Length(3), // Input box
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        self.chat_view.render(frame, chunks[0], &self.theme);
        self.input_box.render(frame, chunks[1], &self.theme);
        self.status_bar.render(frame, chunks[2], &self.theme);

        // Render help popup last (on top)
        self.help_popup.render(frame, frame.size(), &self.theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leapchat::chat::{ChatSessionConfig, Role, SubmitOutcome};
    use leapchat::client::{ChatBackend, HealthReport, HealthStatus};
    use leapchat::Result;

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn send_message(&self, message: &str) -> Result<String> {
            Ok(format!("echo: {}", message))
        }

        async fn health_check(&self) -> Result<HealthStatus> {
            Ok(HealthStatus::healthy(200, 1, HealthReport::default()))
        }

        fn base_url(&self) -> &str {
            "http://localhost:8000"
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn build_app() -> (App, SharedTranscript, mpsc::UnboundedReceiver<Event>) {
        let transcript = SharedTranscript::new();
        let input = InputState::new();
        let session = Arc::new(ChatSession::new(
            Arc::new(EchoBackend),
            Arc::new(transcript.clone()),
            Arc::new(input.clone()),
            ChatSessionConfig::default(),
        ));
        let (sender, receiver) = mpsc::unbounded_channel();
        let app = App::new(
            session,
            transcript.clone(),
            input,
            sender,
            Theme::dark(),
            "http://localhost:8000",
            true,
        );
        (app, transcript, receiver)
    }

    #[tokio::test]
    async fn test_enter_submits_through_session() {
        let (mut app, transcript, mut receiver) = build_app();

        for c in "hi".chars() {
            app.handle_event(key(KeyCode::Char(c)));
        }
        app.handle_event(key(KeyCode::Enter));
        assert!(app.submitting);

        let settled = receiver.recv().await.unwrap();
        assert!(matches!(
            settled,
            Event::SubmissionSettled(SubmitOutcome::Replied)
        ));
        app.handle_event(settled);
        assert!(!app.submitting);

        let messages: Vec<(Role, String)> =
            transcript.read(|t| t.messages().map(|m| (m.role, m.text.clone())).collect());
        assert_eq!(
            messages,
            vec![
                (Role::User, "hi".to_string()),
                (Role::Bot, "echo: hi".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_enter_does_nothing() {
        let (mut app, transcript, _receiver) = build_app();

        app.handle_event(key(KeyCode::Char(' ')));
        app.handle_event(key(KeyCode::Enter));

        assert!(!app.submitting);
        assert!(transcript.read(|t| t.is_empty()));
    }

    #[test]
    fn test_ctrl_q_quits() {
        let (mut app, _, _) = build_app();

        app.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('q'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.should_quit());
    }
}
