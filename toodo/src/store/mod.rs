//! Remote store adapter for the `TooDo` document database.
//!
//! Defines the [`TaskStore`] trait that hides the hosted document store
//! behind four operations on the `tasks` collection. Concrete
//! implementations:
//! - [`memory::InMemoryStore`] — deterministic in-process store for tests
//!   and offline demo mode
//! - [`remote::RemoteStore`] — live gateway client (WebSocket listen
//!   channel for queries, HTTPS for mutations)
//!
//! Live queries are delivered as a mailbox of [`StoreEvent`]s rather than
//! callbacks: producers run on background tasks and the consumer drains
//! the mailbox on its own thread before mutating any view state.

pub mod memory;
pub mod remote;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use toodo_proto::task::{Task, TaskId};
use toodo_proto::user::UserId;

/// Errors surfaced by the store adapter.
///
/// Both implementations map whatever the underlying service or transport
/// returns onto these kinds; nothing else crosses the adapter boundary.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The task text was empty after trimming.
    #[error("task text cannot be empty")]
    EmptyText,
    /// The caller is not signed in, or the session has expired.
    #[error("not authenticated")]
    Unauthenticated,
    /// The session does not grant access to the requested documents.
    #[error("permission denied")]
    PermissionDenied,
    /// The service could not be reached or the connection was lost.
    #[error("network error: {0}")]
    Network(String),
    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(String),
    /// Any other failure in the store or the service behind it.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Events delivered on a live subscription's mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A complete snapshot of the watched query, newest first.
    Snapshot(Vec<Task>),
    /// The subscription failed; see [`StoreError`] for the kind.
    Error(StoreError),
}

/// Idempotent cancellation flag shared between a subscription and its
/// producer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the subscription. Returns `true` if this call performed the
    /// cancellation, `false` if it was already cancelled.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    /// Whether the subscription has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An open live query.
///
/// Events arrive in order on the internal mailbox. After [`cancel`]
/// (or drop) no further events are observable — anything already enqueued
/// is discarded.
///
/// [`cancel`]: TaskSubscription::cancel
pub struct TaskSubscription {
    events: mpsc::Receiver<StoreEvent>,
    cancel: CancelToken,
}

impl TaskSubscription {
    /// Assemble a subscription from its mailbox and cancel flag.
    /// Store implementations call this; consumers get one from
    /// [`TaskStore::subscribe`].
    #[must_use]
    pub fn new(events: mpsc::Receiver<StoreEvent>, cancel: CancelToken) -> Self {
        Self { events, cancel }
    }

    /// Non-blocking drain step for the consumer's tick loop.
    ///
    /// Returns `None` once the mailbox is empty, the producer is gone, or
    /// the subscription has been cancelled.
    pub fn try_next(&mut self) -> Option<StoreEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.events.try_recv().ok()
    }

    /// Await the next event. Used by non-TUI consumers and tests.
    ///
    /// Returns `None` when the producer is gone or the subscription has
    /// been cancelled.
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.events.recv().await
    }

    /// Cancel the subscription. Idempotent; returns `true` only for the
    /// call that performed the cancellation.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    /// A clone of the cancel flag, for producers that need to observe it.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Drop for TaskSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The four operations the document store is consumed through, keyed on
/// the single `tasks` collection.
pub trait TaskStore: Send + Sync {
    /// Open a live query for `owner`'s tasks with the given completion
    /// flag, ordered newest first (id tie-break applied client-side).
    ///
    /// Every delivered snapshot is complete and internally consistent;
    /// snapshots arrive in order; the first snapshot is delivered on
    /// initial subscription even when empty. A null result from the
    /// underlying query is logged and dropped, never delivered.
    fn subscribe(
        &self,
        owner: &UserId,
        completed: bool,
    ) -> impl std::future::Future<Output = Result<TaskSubscription, StoreError>> + Send;

    /// Insert a new task `{text, completed: false, created_at: server now,
    /// owner_id}`. The text is trimmed; [`StoreError::EmptyText`] if the
    /// trimmed value is empty. Resolves on server acknowledgement — the
    /// new task (and its id) is surfaced by the subscription, not
    /// returned here.
    fn add(
        &self,
        owner: &UserId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Update only the `completed` field of a task.
    fn set_completed(
        &self,
        id: &TaskId,
        completed: bool,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a task. A second delete of an already-deleted id surfaces
    /// [`StoreError::NotFound`], which callers treat as success.
    fn remove(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
