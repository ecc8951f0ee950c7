//! Sidebar: conversation list split into group and direct sections, with
//! unread badges and presence dots. Row content comes straight from the
//! `ChatStore`, so a new message or presence change shows on the next draw.

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::state::ChatStore;

/// One row in the sidebar's flat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarRow {
    /// "GROUPS" section header (occupies a row, not selectable)
    GroupsHeader,
    /// "DIRECT" section header
    DirectHeader,
    /// A conversation row (index into the store's conversation list)
    Conversation(usize),
}

/// Sidebar navigation state. The rows themselves are derived from the store
/// on demand so ordering always matches the conversation list.
pub struct SidebarState {
    /// Index into the flat row list.
    pub selected: usize,
    /// Whether the first room list is still loading.
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            selected: 1,
            loading: true,
        }
    }
}

/// Build the flat row list: groups first, then direct conversations, each
/// section keeping the store's most-recent-first order.
pub fn flat_rows(store: &ChatStore) -> Vec<SidebarRow> {
    let mut rows = vec![SidebarRow::GroupsHeader];
    for (i, conv) in store.conversations().iter().enumerate() {
        if conv.is_group {
            rows.push(SidebarRow::Conversation(i));
        }
    }
    rows.push(SidebarRow::DirectHeader);
    for (i, conv) in store.conversations().iter().enumerate() {
        if !conv.is_group {
            rows.push(SidebarRow::Conversation(i));
        }
    }
    rows
}

impl SidebarState {
    /// The conversation id of the selected row, if it is a conversation.
    pub fn selected_conversation(&self, store: &ChatStore) -> Option<String> {
        match flat_rows(store).get(self.selected)? {
            SidebarRow::Conversation(i) => store.conversations().get(*i).map(|c| c.id.clone()),
            _ => None,
        }
    }

    pub fn move_up(&mut self, store: &ChatStore) {
        if self.selected > 0 {
            self.selected -= 1;
        }
        self.skip_headers(store, Direction::Up);
    }

    pub fn move_down(&mut self, store: &ChatStore) {
        let count = flat_rows(store).len();
        if count > 0 && self.selected < count - 1 {
            self.selected += 1;
        }
        self.skip_headers(store, Direction::Down);
    }

    /// Clamp the selection after the conversation list changed shape.
    pub fn clamp(&mut self, store: &ChatStore) {
        let count = flat_rows(store).len();
        if count == 0 {
            self.selected = 0;
            return;
        }
        if self.selected >= count {
            self.selected = count - 1;
        }
        self.skip_headers(store, Direction::Down);
    }

    fn skip_headers(&mut self, store: &ChatStore, direction: Direction) {
        let rows = flat_rows(store);
        if !rows
            .iter()
            .any(|r| matches!(r, SidebarRow::Conversation(_)))
        {
            return;
        }
        let is_header = |idx: usize| {
            matches!(
                rows.get(idx),
                Some(SidebarRow::GroupsHeader | SidebarRow::DirectHeader)
            )
        };

        while is_header(self.selected) {
            match direction {
                Direction::Up if self.selected > 0 => self.selected -= 1,
                Direction::Down if self.selected + 1 < rows.len() => self.selected += 1,
                // Ran off the end; walk the other way to the nearest row.
                _ => {
                    return self.skip_headers(
                        store,
                        match direction {
                            Direction::Up => Direction::Down,
                            Direction::Down => Direction::Up,
                        },
                    )
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the sidebar into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &SidebarState,
    store: &ChatStore,
    now: Instant,
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

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(" Conversations ");
    let inner = block.inner(area);
    block.render(area, buf);

    if state.loading && store.conversations().is_empty() {
        if inner.height > 0 && inner.width > 0 {
            let line = Line::from(Span::styled(
                " Loading...",
                Style::default().fg(Color::DarkGray),
            ));
            Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        }
        return;
    }

    let rows = flat_rows(store);
    let height = inner.height as usize;
    if height == 0 || rows.is_empty() {
        return;
    }

    let scroll_offset = compute_scroll_offset(state.selected, height, rows.len());

    for (row_idx, item_idx) in (scroll_offset..rows.len()).take(height).enumerate() {
        let row_area = Rect::new(inner.x, inner.y + row_idx as u16, inner.width, 1);
        render_row_item(
            buf,
            row_area,
            &rows[item_idx],
            item_idx == state.selected,
            store,
            now,
        );
    }
}

/// Simple scroll offset: keep the selected row visible.
fn compute_scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    let max_offset = total.saturating_sub(height);
    selected.saturating_sub(height - 1).min(max_offset)
}

fn render_row_item(
    buf: &mut Buffer,
    area: Rect,
    row: &SidebarRow,
    selected: bool,
    store: &ChatStore,
    now: Instant,
) {
    match row {
        SidebarRow::GroupsHeader => {
            let style = Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD);
            render_row(buf, area, " GROUPS", "", style, style);
        }
        SidebarRow::DirectHeader => {
            let width = area.width as usize;
            let prefix = " -- DIRECT ";
            let dashes = width.saturating_sub(prefix.len());
            let label = format!("{}{}", prefix, "-".repeat(dashes));
            let style = Style::default().fg(Color::DarkGray);
            render_row(buf, area, &label, "", style, style);
        }
        SidebarRow::Conversation(i) => {
            let Some(conv) = store.conversations().get(*i) else {
                return;
            };
            let online = store.peer_online(&conv.id, now);
            let cursor = if selected { "\u{25BA}" } else { " " };
            let icon = if conv.is_group { "+" } else { "*" };
            let label = format!("{}{} {}", cursor, icon, conv.display_name(store.self_id()));

            let badge = if conv.unread_count > 0 {
                conv.unread_count.to_string()
            } else if online {
                "\u{25CF}".to_string()
            } else {
                String::new()
            };

            let style = item_style(selected, conv.unread_count > 0);
            let bstyle = if conv.unread_count > 0 {
                badge_style(selected)
            } else if online {
                Style::default().fg(Color::Green)
            } else {
                style
            };

            render_row(buf, area, &label, &badge, style, bstyle);
        }
    }
}

/// Style for a conversation row based on selection and unread state.
fn item_style(selected: bool, has_unread: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else if has_unread {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn badge_style(selected: bool) -> Style {
    let style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    if selected {
        style.bg(Color::DarkGray)
    } else {
        style
    }
}

/// Render a row with left-aligned text and an optional right-aligned badge.
fn render_row(
    buf: &mut Buffer,
    area: Rect,
    left: &str,
    badge: &str,
    text_style: Style,
    badge_style: Style,
) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }

    let badge_len = badge.chars().count();
    let max_left = if badge_len > 0 {
        width.saturating_sub(badge_len + 1)
    } else {
        width
    };

    let left_truncated: String = left.chars().take(max_left).collect();
    let left_len = left_truncated.chars().count();
    let pad = width.saturating_sub(left_len + badge_len);

    let line = Line::from(vec![
        Span::styled(left_truncated, text_style),
        Span::styled(" ".repeat(pad), text_style),
        Span::styled(badge.to_string(), badge_style),
    ]);

    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conversation, UserRef};
    use crate::state::ChatStore;

    fn store_with(groups: &[&str], directs: &[&str]) -> ChatStore {
        let mut store = ChatStore::new("me");
        let mut convs = Vec::new();
        for id in groups {
            convs.push(conv(id, true));
        }
        for id in directs {
            convs.push(conv(id, false));
        }
        store.set_conversations(convs);
        store
    }

    fn conv(id: &str, is_group: bool) -> Conversation {
        Conversation {
            id: id.to_string(),
            name: is_group.then(|| format!("group {id}")),
            is_group,
            participants: vec![
                UserRef {
                    id: "me".into(),
                    display_name: None,
                },
                UserRef {
                    id: "peer".into(),
                    display_name: Some("Peer".into()),
                },
            ],
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    #[test]
    fn test_flat_rows_sections() {
        let store = store_with(&["g1"], &["d1", "d2"]);
        let rows = flat_rows(&store);
        assert_eq!(rows[0], SidebarRow::GroupsHeader);
        assert_eq!(rows[1], SidebarRow::Conversation(0));
        assert_eq!(rows[2], SidebarRow::DirectHeader);
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_navigation_skips_headers() {
        let store = store_with(&["g1"], &["d1"]);
        let mut state = SidebarState::default();
        state.clamp(&store);

        // First selectable row is the group.
        assert_eq!(
            state.selected_conversation(&store),
            Some("g1".to_string())
        );

        // Moving down lands on the direct conversation, not the header.
        state.move_down(&store);
        assert_eq!(
            state.selected_conversation(&store),
            Some("d1".to_string())
        );

        // And back up again.
        state.move_up(&store);
        assert_eq!(
            state.selected_conversation(&store),
            Some("g1".to_string())
        );
    }

    #[test]
    fn test_clamp_after_list_shrinks() {
        let store = store_with(&[], &["d1"]);
        let mut state = SidebarState {
            selected: 10,
            loading: false,
        };
        state.clamp(&store);
        assert_eq!(
            state.selected_conversation(&store),
            Some("d1".to_string())
        );
    }

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(compute_scroll_offset(2, 5, 20), 0);
        assert_eq!(compute_scroll_offset(7, 5, 20), 3);
        assert_eq!(compute_scroll_offset(19, 5, 20), 15);
    }
}
