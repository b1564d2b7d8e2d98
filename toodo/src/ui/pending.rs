//! Pending screen rendering (compose/search row + open task list).

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::{format_timestamp_ms, render_input_row, theme};
use crate::app::App;
use crate::store::TaskStore;
use crate::views::ViewPhase;

/// Render the pending screen.
pub fn render<S: TaskStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    render_input_row(frame, chunks[0], app);
    render_list(frame, chunks[1], app);
}

fn render_list<S: TaskStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let view = &app.pending;
    let block = Block::default()
        .title("Tasks")
        .borders(Borders::ALL)
        .border_style(theme::normal());

    if view.visible().is_empty() {
        let message = empty_message(view.phase(), view.all_tasks().is_empty());
        let paragraph = Paragraph::new(Line::from(Span::styled(message, theme::dimmed())))
            .block(block)
            .centered();
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = view
        .visible()
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let style = if i == app.selected {
                theme::selected()
            } else {
                theme::normal()
            };
            let line = Line::from(vec![
                Span::styled("[ ] ", style),
                Span::styled(task.text.clone(), style),
                Span::raw("  "),
                Span::styled(
                    format_timestamp_ms(task.created_at, &app.timestamp_format),
                    theme::dimmed(),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

/// Empty-state text: distinguishes "nothing at all" from "nothing matches
/// the query", plus the transitional phases.
fn empty_message(phase: ViewPhase, all_empty: bool) -> &'static str {
    match phase {
        ViewPhase::Idle | ViewPhase::Subscribing => "Loading tasks…",
        ViewPhase::Error => "Could not load tasks",
        ViewPhase::Live if all_empty => "No tasks yet. Type above to add your first one.",
        ViewPhase::Live => "No tasks match your search.",
    }
}
