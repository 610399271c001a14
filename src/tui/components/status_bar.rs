use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use leapchat::chat::{FailureKind, SubmitOutcome};

use crate::tui::{components::Component, Event, Theme};

pub struct StatusBar {
    status_message: String,
    backend_url: String,
    connection_status: ConnectionStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionStatus {
    Unknown,
    Sending,
    Connected,
    Error(String),
}

impl StatusBar {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            status_message: "Ready".to_string(),
            backend_url: backend_url.into(),
            connection_status: ConnectionStatus::Unknown,
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
    }

    #[allow(dead_code)]
    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection_status
    }

    /// Reflects how the last submission settled.
    pub fn record_outcome(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Ignored | SubmitOutcome::Busy => {}
            SubmitOutcome::Replied => {
                self.connection_status = ConnectionStatus::Connected;
                self.status_message = "Type your message (Enter to send)".to_string();
            }
            SubmitOutcome::Failed(kind) => {
                let reason = match kind {
                    FailureKind::Transport => "backend unreachable".to_string(),
                    FailureKind::Status(code) => format!("backend returned {}", code),
                    FailureKind::Decode => "malformed reply".to_string(),
                    FailureKind::Timeout => "request timed out".to_string(),
                };
                self.connection_status = ConnectionStatus::Error(reason);
                self.status_message = "Request failed".to_string();
            }
        }
    }

    fn connection_indicator(&self, theme: &Theme) -> (&'static str, Style) {
        match &self.connection_status {
            ConnectionStatus::Unknown => ("○", theme.secondary()),
            ConnectionStatus::Sending => ("◐", theme.warning()),
            ConnectionStatus::Connected => ("●", theme.success()),
            ConnectionStatus::Error(_) => ("●", theme.error()),
        }
    }
}

impl Component for StatusBar {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let (conn_symbol, conn_style) = self.connection_indicator(theme);
        let conn_label = match &self.connection_status {
            ConnectionStatus::Unknown => "Idle",
            ConnectionStatus::Sending => "Sending...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error(err) => err.as_str(),
        };

        let status_line = Line::from(vec![
            Span::styled(&self.status_message, theme.normal()),
            Span::raw(" | "),
            Span::styled(&self.backend_url, theme.accent()),
            Span::raw(" | "),
            Span::styled(conn_symbol, conn_style),
            Span::raw(" "),
            Span::styled(conn_label, theme.secondary()),
            Span::raw(" | "),
            Span::styled("F1: Help", theme.secondary()),
            Span::raw(" | "),
            Span::styled("Ctrl+Q: Quit", theme.secondary()),
        ]);

        let paragraph = Paragraph::new(status_line).alignment(Alignment::Left);
        frame.render_widget(paragraph, area);
    }

    fn handle_event(&mut self, _event: &Event) -> bool {
        false // Status bar doesn't handle events
    }
}
