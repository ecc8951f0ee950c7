//! Compose line: single-line text input with cursor editing.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

/// Height of the compose box: input line plus borders.
pub const COMPOSE_HEIGHT: u16 = 3;

/// State for the compose input.
#[derive(Default)]
pub struct ComposeState {
    input: String,
    /// Cursor position as a character offset into `input`.
    cursor: usize,
}

impl ComposeState {
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let end = self.char_to_byte(self.cursor);
            let start = self.char_to_byte(self.cursor - 1);
            self.input.drain(start..end);
            self.cursor -= 1;
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.input.trim().is_empty()
    }

    /// Take the trimmed input for sending, clearing the box. `None` when the
    /// input is empty or whitespace-only.
    pub fn take(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        self.clear();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

/// Render the compose box.
pub fn render(area: Rect, buf: &mut Buffer, state: &ComposeState, focused: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(" Message (Enter to send) ");
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let line = if state.input.is_empty() && !focused {
        Line::from(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        // Keep the cursor visible: show the tail when the input overflows.
        let width = inner.width as usize;
        let before_cursor: String = state.input.chars().take(state.cursor).collect();
        let skip = before_cursor.width().saturating_sub(width.saturating_sub(1));
        let visible: String = state.input.chars().skip(skip).collect();
        Line::from(Span::raw(visible))
    };

    Paragraph::new(line).render(inner, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_take() {
        let mut compose = ComposeState::default();
        for c in "hello".chars() {
            compose.insert_char(c);
        }
        assert_eq!(compose.take(), Some("hello".to_string()));
        assert!(compose.is_empty());
    }

    #[test]
    fn test_take_ignores_whitespace_only() {
        let mut compose = ComposeState::default();
        compose.insert_char(' ');
        compose.insert_char(' ');
        assert_eq!(compose.take(), None);
    }

    #[test]
    fn test_cursor_editing_with_multibyte_chars() {
        let mut compose = ComposeState::default();
        for c in "héllo".chars() {
            compose.insert_char(c);
        }
        // Move after 'h' and delete the accented char.
        compose.move_home();
        compose.move_right();
        compose.move_right();
        compose.backspace();
        assert_eq!(compose.take(), Some("hllo".to_string()));
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut compose = ComposeState::default();
        compose.insert_char('a');
        compose.move_home();
        compose.backspace();
        assert_eq!(compose.take(), Some("a".to_string()));
    }
}
