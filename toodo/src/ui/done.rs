//! Done screen rendering (completed task list, search row on demand).

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::{format_timestamp_ms, render_input_row, theme};
use crate::app::App;
use crate::store::TaskStore;
use crate::views::{InputMode, ViewPhase};

/// Render the done screen. Outside of search there is no input row — the
/// list takes the full area.
pub fn render<S: TaskStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let needs_input_row =
        app.done.mode() == InputMode::Search || app.confirm_delete.is_some();

    if needs_input_row {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);
        render_input_row(frame, chunks[0], app);
        render_list(frame, chunks[1], app);
    } else {
        render_list(frame, area, app);
    }
}

fn render_list<S: TaskStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let view = &app.done;
    let block = Block::default()
        .title("Completed")
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
            let selected = i == app.selected;
            let text_style = if selected {
                theme::selected()
            } else {
                theme::normal()
            };
            let line = Line::from(vec![
                Span::styled("[✓] ", theme::normal().fg(theme::DONE)),
                Span::styled(task.text.clone(), text_style),
                Span::raw("  "),
                Span::styled(
                    format!(
                        "created {}",
                        format_timestamp_ms(task.created_at, &app.timestamp_format)
                    ),
                    theme::dimmed(),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn empty_message(phase: ViewPhase, all_empty: bool) -> &'static str {
    match phase {
        ViewPhase::Idle | ViewPhase::Subscribing => "Loading tasks…",
        ViewPhase::Error => "Could not load tasks",
        ViewPhase::Live if all_empty => "You have no completed tasks yet.",
        ViewPhase::Live => "No tasks match your search.",
    }
}
