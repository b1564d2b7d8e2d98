//! Application state and event handling.
//!
//! [`App`] binds the two task list view-models to the terminal: it owns
//! the active screen, the shared input row, row selection, the
//! delete-confirmation prompt, and the notice line. It holds no domain
//! state of its own — everything task-shaped lives in the view-models.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use toodo_proto::task::TaskId;

use crate::store::{StoreError, TaskStore};
use crate::views::{InputMode, TaskListView};

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Open tasks (`completed = false`), with the compose row.
    Pending,
    /// Completed tasks (`completed = true`), list-only outside search.
    Done,
}

impl Screen {
    /// Display title for the header and status bar.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Pending => "Tasks",
            Self::Done => "Completed",
        }
    }
}

/// Main application state.
pub struct App<S: TaskStore + 'static> {
    /// View-model behind the pending screen.
    pub pending: TaskListView<S>,
    /// View-model behind the done screen.
    pub done: TaskListView<S>,
    /// Which screen is showing.
    pub screen: Screen,
    /// Current text input (compose or search, depending on mode).
    pub input: String,
    /// Cursor position in the input (byte index at a char boundary).
    pub cursor: usize,
    /// Selected row in the visible list.
    pub selected: usize,
    /// Task awaiting delete confirmation, if any.
    pub confirm_delete: Option<TaskId>,
    /// Most recent alert or system notice.
    pub notice: Option<String>,
    /// Signed-in account email, for the status bar.
    pub email: Option<String>,
    /// "Remote" or "Demo", for the status bar.
    pub connection_label: String,
    /// chrono format string for row timestamps.
    pub timestamp_format: String,
    /// Whether the app should quit.
    pub should_quit: bool,
    sign_out_requested: bool,
}

impl<S: TaskStore + 'static> App<S> {
    /// Create the app with both view-models over a shared store handle.
    #[must_use]
    pub fn new(store: std::sync::Arc<S>, connection_label: &str) -> Self {
        Self {
            pending: TaskListView::new(std::sync::Arc::clone(&store), false),
            done: TaskListView::new(store, true),
            screen: Screen::Pending,
            input: String::new(),
            cursor: 0,
            selected: 0,
            confirm_delete: None,
            notice: None,
            email: None,
            connection_label: connection_label.to_string(),
            timestamp_format: "%d/%m/%y %H:%M".to_string(),
            should_quit: false,
            sign_out_requested: false,
        }
    }

    /// Override the row timestamp format (from configuration).
    #[must_use]
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    /// The view-model behind the showing screen.
    #[must_use]
    pub fn active_view(&self) -> &TaskListView<S> {
        match self.screen {
            Screen::Pending => &self.pending,
            Screen::Done => &self.done,
        }
    }

    fn active_view_mut(&mut self) -> &mut TaskListView<S> {
        match self.screen {
            Screen::Pending => &mut self.pending,
            Screen::Done => &mut self.done,
        }
    }

    /// The input mode the active screen returns to when leaving search.
    fn base_mode(&self) -> InputMode {
        match self.screen {
            Screen::Pending => InputMode::Compose,
            Screen::Done => InputMode::List,
        }
    }

    /// Drive both view-models one tick and surface any new alerts.
    pub fn poll_views(&mut self) {
        self.pending.poll();
        self.done.poll();
        if let Some(e) = self.pending.take_error() {
            self.handle_view_error(e);
        }
        if let Some(e) = self.done.take_error() {
            self.handle_view_error(e);
        }
        // Snapshots shrink; keep the selection on a real row.
        let len = self.active_view().visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// A lost session routes back to sign-in; everything else is an alert.
    fn handle_view_error(&mut self, err: StoreError) {
        if matches!(err, StoreError::Unauthenticated) {
            self.notice = Some("Session expired — signing out".to_string());
            self.sign_out_requested = true;
        } else {
            self.notice = Some(format!("Error: {err}"));
        }
    }

    /// Whether a sign-out was requested since the last call. Consumes the
    /// request.
    pub fn take_sign_out_request(&mut self) -> bool {
        std::mem::take(&mut self.sign_out_requested)
    }

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        // The confirmation prompt captures everything until resolved.
        if self.confirm_delete.is_some() {
            self.handle_confirm_key(key);
            return;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => self.should_quit = true,
            (KeyCode::Char('q'), KeyModifiers::CONTROL) => self.sign_out_requested = true,
            (KeyCode::Char('f'), KeyModifiers::CONTROL) => self.toggle_search(),
            (KeyCode::Char('t'), KeyModifiers::CONTROL) => self.toggle_selected(),
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => self.request_delete(),
            (KeyCode::Esc, _) => self.leave_search(),
            (KeyCode::Tab | KeyCode::BackTab, _) => self.switch_screen(),
            (KeyCode::Enter, _) => self.submit(),
            (KeyCode::Up, _) => self.select_prev(),
            (KeyCode::Down, _) => self.select_next(),
            (KeyCode::Backspace, _) => self.delete_char(),
            (KeyCode::Left, _) => self.move_cursor_left(),
            (KeyCode::Right, _) => self.move_cursor_right(),
            (KeyCode::Home, _) => self.cursor = 0,
            (KeyCode::End, _) => self.cursor = self.input.len(),
            (KeyCode::Char(c), _) => self.enter_char(c),
            _ => {}
        }
    }

    /// Handle a key while the delete confirmation is showing.
    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                if let Some(id) = self.confirm_delete.take() {
                    self.active_view_mut().destroy(&id);
                }
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => self.confirm_delete = None,
            _ => {}
        }
    }

    /// Switch between the pending and done screens.
    fn switch_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Pending => Screen::Done,
            Screen::Done => Screen::Pending,
        };
        self.clear_input();
        self.selected = 0;
    }

    /// Flip the header toggle: enter search, or leave it for the screen's
    /// base mode.
    fn toggle_search(&mut self) {
        let target = if self.active_view().mode() == InputMode::Search {
            self.base_mode()
        } else {
            InputMode::Search
        };
        self.active_view_mut().set_mode(target);
        self.clear_input();
    }

    /// Esc leaves search mode (clearing the query); otherwise no-op.
    fn leave_search(&mut self) {
        if self.active_view().mode() == InputMode::Search {
            let base = self.base_mode();
            self.active_view_mut().set_mode(base);
            self.clear_input();
        }
    }

    /// Enter submits the compose row. Search applies on every keystroke,
    /// so Enter does nothing there.
    fn submit(&mut self) {
        if self.screen != Screen::Pending || self.pending.mode() != InputMode::Compose {
            return;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.pending.in_flight() {
            self.notice = Some("Still adding the previous task".to_string());
            return;
        }
        self.pending.create(&text);
        self.clear_input();
    }

    /// Toggle completion of the selected row: complete on the pending
    /// screen, uncomplete on the done screen. Immediate, no confirmation.
    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        match self.screen {
            Screen::Pending => self.pending.complete(&id),
            Screen::Done => self.done.uncomplete(&id),
        }
    }

    /// Ask for confirmation before deleting the selected row.
    fn request_delete(&mut self) {
        self.confirm_delete = self.selected_task_id();
    }

    fn selected_task_id(&self) -> Option<TaskId> {
        self.active_view()
            .visible()
            .get(self.selected)
            .map(|t| t.id.clone())
    }

    fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    fn select_next(&mut self) {
        let len = self.active_view().visible().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    fn enter_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.apply_live_query();
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let Some((idx, _)) = self.input[..self.cursor].char_indices().next_back() else {
            return;
        };
        self.input.remove(idx);
        self.cursor = idx;
        self.apply_live_query();
    }

    fn move_cursor_left(&mut self) {
        if let Some((idx, _)) = self.input[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn move_cursor_right(&mut self) {
        if self.cursor < self.input.len() {
            let next = self.input[self.cursor..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            self.cursor += next;
        }
    }

    /// In search mode the filter tracks the input on every edit.
    fn apply_live_query(&mut self) {
        if self.active_view().mode() == InputMode::Search {
            let query = self.input.clone();
            self.active_view_mut().set_query(&query);
            self.selected = 0;
        }
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }
}
