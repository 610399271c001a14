use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use leapchat::chat::{InputControl, InputState};

use crate::tui::{components::Component, Event, Theme};

/// Single-line message field. Enabled, cleared and focused through the
/// shared [`InputState`] the chat session drives.
pub struct InputBox {
    input: Input,
    state: InputState,
    is_focused: bool,
    placeholder: String,
}

impl InputBox {
    pub fn new(state: InputState) -> Self {
        Self {
            input: Input::default(),
            state,
            is_focused: true,
            placeholder: "Ask about a course... (Enter: Send)".to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    #[allow(dead_code)]
    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    pub fn content(&self) -> String {
        self.input.value().to_string()
    }

    /// Applies pending requests from the session: clear, focus, and loss of
    /// focus while disabled.
    pub fn sync(&mut self) {
        if self.state.take_clear_request() {
            self.input.reset();
        }
        if !self.state.is_enabled() {
            self.is_focused = false;
        } else if self.state.take_focus_request() {
            self.is_focused = true;
        }
    }

    fn visible_window(&self, available_width: usize) -> (String, usize) {
        let cursor_pos = self.input.visual_cursor();
        let scroll_offset = if cursor_pos >= available_width {
            cursor_pos.saturating_sub(available_width) + 1
        } else {
            0
        };

        let chars: Vec<char> = self.input.value().chars().collect();
        let start = scroll_offset.min(chars.len());
        let end = (start + available_width).min(chars.len());
        let visible = chars[start..end].iter().collect::<String>();

        (visible, cursor_pos.saturating_sub(scroll_offset))
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.sync();

        let enabled = self.state.is_enabled();
        let (title, border_style) = if !enabled {
            (" Waiting for reply... ", theme.disabled())
        } else if self.is_focused {
            (" Message ", theme.accent())
        } else {
            (" Message ", theme.border())
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);

        if self.input.value().is_empty() {
            let content = Line::from(Span::styled(&self.placeholder, theme.secondary()));
            let paragraph = Paragraph::new(content).block(block).style(theme.normal());
            frame.render_widget(paragraph, area);
            return;
        }

        let available_width = area.width.saturating_sub(2) as usize;
        let (visible_text, cursor_in_view) = self.visible_window(available_width);

        let text_style = if enabled { theme.normal() } else { theme.disabled() };
        let paragraph = Paragraph::new(Line::from(visible_text))
            .block(block)
            .style(text_style);
        frame.render_widget(paragraph, area);

        if self.is_focused && enabled {
            let cursor_x = area.x + 1 + cursor_in_view as u16;
            let cursor_y = area.y + 1;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                frame.set_cursor(cursor_x, cursor_y);
            }
        }
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        // Disabled input swallows keys so nothing can be sent.
        if !self.state.is_enabled() {
            return matches!(event, Event::Key(_));
        }

        match event {
            Event::Key(key) => match key.code {
                KeyCode::Enter => false, // Let parent handle send
                _ => {
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        || key.modifiers.contains(KeyModifiers::ALT)
                    {
                        false
                    } else {
                        self.is_focused = true;
                        self.input.handle_event(&crossterm::event::Event::Key(*key));
                        true
                    }
                }
            },
            _ => false,
        }
    }
}
