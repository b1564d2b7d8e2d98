//! Terminal UI rendering.
//!
//! Thin presenters over the view-models: no domain state lives here.
//! Each frame is redrawn from scratch out of [`App`] and the two
//! [`TaskListView`](crate::views::TaskListView)s.

pub mod done;
pub mod pending;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use chrono::{Local, TimeZone};

use crate::app::{App, Screen};
use crate::store::TaskStore;
use crate::views::InputMode;

/// Main draw function for the entire UI.
pub fn draw<S: TaskStore + 'static>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    match app.screen {
        Screen::Pending => pending::render(frame, chunks[0], app),
        Screen::Done => done::render(frame, chunks[0], app),
    }

    status_bar::render(frame, chunks[1], app);
}

/// Format an epoch-millisecond timestamp with the configured chrono
/// format, in local time.
#[must_use]
pub fn format_timestamp_ms(ms: u64, format: &str) -> String {
    let secs = (ms / 1000).cast_signed();
    let nsecs = u32::try_from((ms % 1000) * 1_000_000).unwrap_or(0);
    match Local.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format(format).to_string(),
        _ => "??/??/?? ??:??".to_string(),
    }
}

/// Render the input row: the compose or search field, or the delete
/// confirmation prompt when one is pending. Shared by both screens.
pub(crate) fn render_input_row<S: TaskStore + 'static>(
    frame: &mut Frame,
    area: Rect,
    app: &App<S>,
) {
    if app.confirm_delete.is_some() {
        let prompt = Line::from(Span::styled(
            "Delete this task? (y/n)",
            theme::warning(),
        ));
        let block = Block::default()
            .title("Confirm")
            .borders(Borders::ALL)
            .border_style(theme::warning());
        frame.render_widget(Paragraph::new(prompt).block(block), area);
        return;
    }

    let mode = app.active_view().mode();
    let (title, placeholder) = match mode {
        InputMode::Compose => ("New task", "Type a new task and press Enter"),
        InputMode::Search => ("Search", "Type to filter tasks"),
        InputMode::List => ("", ""),
    };

    // Input text with a block cursor at the edit position.
    let mut display = app.input.clone();
    if app.cursor >= display.len() {
        display.push('█');
    } else {
        display.insert(app.cursor, '█');
    }

    let line = if app.input.is_empty() {
        Line::from(vec![
            Span::styled("█", theme::normal()),
            Span::styled(placeholder, theme::dimmed()),
        ])
    } else {
        Line::from(Span::styled(display, theme::normal()))
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if mode == InputMode::Search {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(Paragraph::new(line).block(block), area);
}
