use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use leapchat::chat::{Entry, MessageEntry, Role, SharedTranscript};

use crate::tui::{components::Component, Event, Theme};

const TYPING_FRAMES: [&str; 3] = [".", "..", "..."];

/// Scrolling transcript. Reads the shared transcript on every frame; it
/// never writes to it.
pub struct ChatView {
    transcript: SharedTranscript,
    title: String,
    show_timestamps: bool,
    auto_scroll: bool,
    scroll_offset: usize,
    typing_frame: usize,
}

impl ChatView {
    pub fn new(
        transcript: SharedTranscript,
        title: impl Into<String>,
        show_timestamps: bool,
    ) -> Self {
        Self {
            transcript,
            title: title.into(),
            show_timestamps,
            auto_scroll: true,
            scroll_offset: 0,
            typing_frame: 0,
        }
    }

    /// Advances the typing indicator animation.
    pub fn tick(&mut self) {
        self.typing_frame = (self.typing_frame + 1) % TYPING_FRAMES.len();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.auto_scroll = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
        // Render clamps the offset and re-enables auto scroll at the bottom
        self.auto_scroll = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = usize::MAX;
        self.auto_scroll = true;
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
        self.auto_scroll = false;
    }

    fn format_timestamp(message: &MessageEntry) -> String {
        message
            .timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string()
    }

    fn role_indicator(role: Role, theme: &Theme) -> (&'static str, &'static str, Style) {
        match role {
            Role::User => ("👤", "You", theme.accent()),
            Role::Bot => ("🤖", "Assistant", theme.success()),
        }
    }

    fn message_lines(
        &self,
        message: &MessageEntry,
        width: usize,
        theme: &Theme,
    ) -> Vec<Line<'static>> {
        let (icon, label, style) = Self::role_indicator(message.role, theme);

        let mut header = vec![
            Span::styled(icon, style),
            Span::raw(" "),
            Span::styled(label, style),
        ];
        if self.show_timestamps {
            header.push(Span::raw(" "));
            header.push(Span::styled(Self::format_timestamp(message), theme.secondary()));
        }

        let mut lines = vec![Line::from(header)];
        for line in wrap_text(&message.text, width.saturating_sub(2)) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line, theme.normal()),
            ]));
        }
        lines.push(Line::from(""));
        lines
    }

    fn typing_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        let (icon, label, style) = Self::role_indicator(Role::Bot, theme);
        vec![
            Line::from(vec![
                Span::styled(icon, style),
                Span::raw(" "),
                Span::styled(label, style),
            ]),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    format!("typing{}", TYPING_FRAMES[self.typing_frame]),
                    theme.secondary(),
                ),
            ]),
        ]
    }
}

/// Word-wraps `text` to `width` terminal columns. Words wider than a line are
/// split at character boundaries.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width < 10 {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        return if lines.is_empty() { vec![String::new()] } else { lines };
    }

    let mut lines = Vec::new();
    for line in text.lines() {
        if line.width() <= width {
            lines.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0;
        for word in line.split_whitespace() {
            let word_width = word.width();
            let needed = if current.is_empty() {
                word_width
            } else {
                current_width + 1 + word_width
            };

            if needed <= width {
                if !current.is_empty() {
                    current.push(' ');
                    current_width += 1;
                }
                current.push_str(word);
                current_width += word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }

            if word_width <= width {
                current.push_str(word);
                current_width = word_width;
            } else {
                for c in word.chars() {
                    let char_width = c.width().unwrap_or(0);
                    if current_width + char_width > width {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0;
                    }
                    current.push(c);
                    current_width += char_width;
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

impl Component for ChatView {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border())
            .title(format!(" {} ", self.title));

        let content_width = area.width.saturating_sub(4) as usize;
        let content_height = area.height.saturating_sub(2) as usize;

        let all_lines: Vec<Line> = self.transcript.read(|transcript| {
            transcript
                .entries()
                .iter()
                .flat_map(|entry| match entry {
                    Entry::Message(message) => self.message_lines(message, content_width, theme),
                    Entry::Typing(_) => self.typing_lines(theme),
                })
                .collect()
        });

        if all_lines.is_empty() {
            let empty_message = Paragraph::new("Ask me anything about NextLeap courses!")
                .block(block)
                .alignment(Alignment::Center)
                .style(theme.secondary());
            frame.render_widget(empty_message, area);
            return;
        }

        let total_lines = all_lines.len();
        let max_scroll = total_lines.saturating_sub(content_height);

        if self.auto_scroll || self.scroll_offset >= max_scroll {
            self.scroll_offset = max_scroll;
            self.auto_scroll = true;
        }

        let end = (self.scroll_offset + content_height).min(total_lines);
        let visible_lines = all_lines[self.scroll_offset..end].to_vec();

        let paragraph = Paragraph::new(visible_lines).block(block);
        frame.render_widget(paragraph, area);
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Key(KeyEvent { code, modifiers, .. }) => match (code, *modifiers) {
                (KeyCode::Up, _) => {
                    self.scroll_up(1);
                    true
                }
                (KeyCode::Down, _) => {
                    self.scroll_down(1);
                    true
                }
                (KeyCode::PageUp, _) => {
                    self.scroll_up(10);
                    true
                }
                (KeyCode::PageDown, _) => {
                    self.scroll_down(10);
                    true
                }
                (KeyCode::Home, KeyModifiers::CONTROL) => {
                    self.scroll_to_top();
                    true
                }
                (KeyCode::End, KeyModifiers::CONTROL) => {
                    self.scroll_to_bottom();
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}
