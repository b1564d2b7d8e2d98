//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::App;
use crate::store::TaskStore;
use crate::views::InputMode;

/// Render the status bar at the bottom of the screen.
pub fn render<S: TaskStore + 'static>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let account = app.email.as_deref().unwrap_or("signed out");

    let help_text = if app.confirm_delete.is_some() {
        "y: delete | n: keep"
    } else {
        match app.active_view().mode() {
            InputMode::Search => "Esc: leave search | Tab: switch screen | Ctrl+Q: sign out",
            InputMode::Compose | InputMode::List => {
                "Tab: switch | Ctrl+F: search | Ctrl+T: toggle | Ctrl+D: delete | Ctrl+Q: sign out"
            }
        }
    };

    let mut spans = vec![
        Span::styled(app.screen.title(), theme::bold()),
        Span::raw(" | "),
        Span::raw(format!("{account} via {}", app.connection_label)),
        Span::raw(" | "),
    ];
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.clone(), theme::warning()));
    } else {
        spans.push(Span::styled(help_text, theme::dimmed()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
