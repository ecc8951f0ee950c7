//! Top-level layout: sidebar, messages pane, compose line, status bar.

use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::{compose, messages, sidebar};

const SIDEBAR_WIDTH: u16 = 32;

/// Render the whole UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let buf = frame.buffer_mut();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
        .split(rows[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(compose::COMPOSE_HEIGHT),
        ])
        .split(columns[1]);

    let now = Instant::now();
    sidebar::render(
        columns[0],
        buf,
        &app.sidebar,
        &app.store,
        now,
        app.active_pane == Pane::Sidebar,
    );
    messages::render(
        right[0],
        buf,
        &mut app.messages,
        &app.store,
        app.active_pane == Pane::Messages,
    );
    compose::render(right[1], buf, &app.compose, app.active_pane == Pane::Compose);

    render_status_bar(rows[1], buf, app);
}

/// One-line status bar: connection state, transient status, key hints.
fn render_status_bar(area: Rect, buf: &mut ratatui::buffer::Buffer, app: &App) {
    let connection_style = if app.connection == "Connected" {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", app.connection), connection_style),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
    ];

    if let Some(ref status) = app.status {
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red),
        ));
    } else {
        spans.push(Span::styled(
            "Tab: pane  Enter: open/send  Esc: back  q: quit",
            Style::default().fg(Color::DarkGray),
        ));
    }

    Paragraph::new(Line::from(spans)).render(area, buf);
}
