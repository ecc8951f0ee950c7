//! Messages pane: renders the open conversation's history with timestamps,
//! senders, attachments, and read indicators on own messages.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

use crate::state::ChatStore;

/// Scroll state for the messages pane. Offset counts rendered lines up from
/// the bottom; 0 means stick to the newest message.
#[derive(Default)]
pub struct MessagesState {
    pub scroll_offset: usize,
    /// Line count from the last render, used to clamp scrolling.
    max_scroll: usize,
}

impl MessagesState {
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.max_scroll);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Back to the bottom (e.g. when switching conversations).
    pub fn reset(&mut self) {
        self.scroll_offset = 0;
    }
}

/// Render the messages pane for the open conversation.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &mut MessagesState,
    store: &ChatStore,
    focused: bool,
) {
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

    let title = match store.open_id().and_then(|id| store.conversation(id)) {
        Some(conv) => format!(" {} ", conv.display_name(store.self_id())),
        None => " Messages ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(title);
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let Some(conv_id) = store.open_id() else {
        let hint = Line::from(Span::styled(
            " Select a conversation (Enter in the sidebar)",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(hint).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    };

    let lines = build_lines(store, conv_id, inner.width as usize);
    let height = inner.height as usize;

    state.max_scroll = lines.len().saturating_sub(height);
    let offset = state.scroll_offset.min(state.max_scroll);
    let start = lines.len().saturating_sub(height + offset);

    for (row, line) in lines.into_iter().skip(start).take(height).enumerate() {
        Paragraph::new(line).render(Rect::new(inner.x, inner.y + row as u16, inner.width, 1), buf);
    }
}

/// Build the rendered line list for a conversation.
fn build_lines(store: &ChatStore, conv_id: &str, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for msg in store.messages(conv_id) {
        let own = msg.sender.id == store.self_id();
        let sender = msg
            .sender
            .display_name
            .clone()
            .unwrap_or_else(|| msg.sender.id.clone());

        let mut header = vec![
            Span::styled(
                msg.created_at.format("%H:%M ").to_string(),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                sender,
                Style::default()
                    .fg(if own { Color::Cyan } else { Color::Green })
                    .add_modifier(Modifier::BOLD),
            ),
        ];
        if own {
            // Single check: delivered. Double check: every peer's read
            // watermark covers this message.
            let mark = if store.is_read_by_peers(conv_id, msg.seq) {
                " \u{2713}\u{2713}"
            } else {
                " \u{2713}"
            };
            header.push(Span::styled(mark, Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));

        for chunk in wrap_text(&msg.content, width.saturating_sub(2)) {
            lines.push(Line::from(Span::raw(format!("  {}", chunk))));
        }

        if let Some(ref url) = msg.attachment_url {
            lines.push(Line::from(Span::styled(
                format!("  [attachment] {}", url),
                Style::default().fg(Color::Blue),
            )));
        }
    }

    lines
}

/// Greedy display-width wrap, breaking on spaces where possible.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in raw_line.split(' ') {
            let word_width: usize = word.chars().map(|c| c.width().unwrap_or(0)).sum();

            if current_width > 0 && current_width + 1 + word_width > width {
                out.push(std::mem::take(&mut current));
                current_width = 0;
            }

            if word_width > width {
                // A single over-long token is hard-broken.
                for ch in word.chars() {
                    let w = ch.width().unwrap_or(0);
                    if current_width + w > width {
                        out.push(std::mem::take(&mut current));
                        current_width = 0;
                    }
                    current.push(ch);
                    current_width += w;
                }
            } else {
                if current_width > 0 {
                    current.push(' ');
                    current_width += 1;
                }
                current.push_str(word);
                current_width += word_width;
            }
        }
        out.push(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_on_spaces() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn test_wrap_hard_breaks_long_tokens() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_preserves_explicit_newlines() {
        let lines = wrap_text("one\ntwo", 20);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_scroll_clamps_to_content() {
        let mut state = MessagesState {
            scroll_offset: 0,
            max_scroll: 5,
        };
        state.scroll_up(3);
        assert_eq!(state.scroll_offset, 3);
        state.scroll_up(10);
        assert_eq!(state.scroll_offset, 5);
        state.scroll_down(2);
        assert_eq!(state.scroll_offset, 3);
        state.scroll_down(10);
        assert_eq!(state.scroll_offset, 0);
    }
}
