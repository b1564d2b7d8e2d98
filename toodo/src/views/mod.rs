//! Task list view-models.
//!
//! A [`TaskListView`] owns the local representation of one filtered task
//! list — the pending screen binds one with `completed_filter = false`,
//! the done screen one with `true`. Each runs its own independent store
//! subscription; mutations are spawned onto the runtime and their
//! outcomes marshalled back through a mailbox drained on the UI thread.

pub mod task_list;

pub use task_list::TaskListView;

use toodo_proto::task::Task;

/// What the screen's input row currently drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Text field + add button driving task creation (pending screen).
    Compose,
    /// Text field driving the free-text filter.
    Search,
    /// No input row (done screen outside of search).
    List,
}

/// Lifecycle state of a view-model's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// No principal bound; the view is empty.
    Idle,
    /// Subscription opened, first snapshot not yet delivered.
    Subscribing,
    /// Snapshots are flowing.
    Live,
    /// The subscription failed. Re-entered via the next auth transition
    /// or an explicit refresh; no automatic retry.
    Error,
}

/// Order-preserving restriction of `tasks` to those whose lowercased text
/// contains `query`. An empty query means no filter. `query` must already
/// be trimmed and lowercased (see [`TaskListView::set_query`]).
#[must_use]
pub fn filter_tasks(tasks: &[Task], query: &str) -> Vec<Task> {
    if query.is_empty() {
        return tasks.to_vec();
    }
    tasks
        .iter()
        .filter(|t| t.text.to_lowercase().contains(query))
        .cloned()
        .collect()
}
