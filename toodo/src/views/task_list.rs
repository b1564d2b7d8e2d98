//! The per-screen task list state machine.
//!
//! Lifecycle:
//!
//! ```text
//!                   +-------- principal = null -----+
//!                   |                               v
//!    [Idle] --principal set--> [Subscribing] --first snapshot--> [Live]
//!       ^                         |                                |
//!       |                         | error                          | principal cleared
//!       |                         v                                v
//!       +---------------------- [Error] <-- retry on next auth --- +
//! ```
//!
//! All state transitions happen on the thread that calls [`poll`] — store
//! events and mutation outcomes arrive through mailboxes, never as
//! callbacks. No failure crosses this boundary as a panic; the presenter
//! reads structured errors via [`take_error`].
//!
//! [`poll`]: TaskListView::poll
//! [`take_error`]: TaskListView::take_error

use std::sync::Arc;

use tokio::sync::mpsc;

use toodo_proto::task::{Task, TaskId};
use toodo_proto::user::{Principal, UserId};

use crate::store::{StoreError, StoreEvent, TaskStore, TaskSubscription};

use super::{InputMode, ViewPhase, filter_tasks};

/// Mailbox capacity for mutation outcomes.
const OUTCOME_BUFFER: usize = 16;

/// Completion results of spawned store mutations.
#[derive(Debug)]
enum MutationOutcome {
    Create(Result<(), StoreError>),
    Toggle(Result<(), StoreError>),
    Destroy(Result<(), StoreError>),
}

/// Owns the local state of one filtered task list (see module docs).
pub struct TaskListView<S: TaskStore + 'static> {
    store: Arc<S>,
    completed_filter: bool,
    phase: ViewPhase,
    owner: Option<UserId>,
    all_tasks: Vec<Task>,
    query: String,
    visible: Vec<Task>,
    mode: InputMode,
    in_flight: bool,
    subscription: Option<TaskSubscription>,
    outcome_tx: mpsc::Sender<MutationOutcome>,
    outcome_rx: mpsc::Receiver<MutationOutcome>,
    last_error: Option<StoreError>,
}

impl<S: TaskStore + 'static> TaskListView<S> {
    /// Create an idle view-model for one completion-flag partition.
    ///
    /// The pending view (`completed_filter = false`) starts in compose
    /// mode; the done view starts in list mode.
    #[must_use]
    pub fn new(store: Arc<S>, completed_filter: bool) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_BUFFER);
        let mode = if completed_filter {
            InputMode::List
        } else {
            InputMode::Compose
        };
        Self {
            store,
            completed_filter,
            phase: ViewPhase::Idle,
            owner: None,
            all_tasks: Vec::new(),
            query: String::new(),
            visible: Vec::new(),
            mode,
            in_flight: false,
            subscription: None,
            outcome_tx,
            outcome_rx,
            last_error: None,
        }
    }

    /// The completion flag this view is bound to.
    #[must_use]
    pub fn completed_filter(&self) -> bool {
        self.completed_filter
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    /// Current input mode.
    #[must_use]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// The active query (trimmed, lowercased; empty = no filter).
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The unfiltered snapshot, newest first.
    #[must_use]
    pub fn all_tasks(&self) -> &[Task] {
        &self.all_tasks
    }

    /// The derived visible list: `all_tasks` restricted by the query.
    #[must_use]
    pub fn visible(&self) -> &[Task] {
        &self.visible
    }

    /// Whether a create call is outstanding.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Take the most recent surfaced error, clearing it. The presenter
    /// calls this once per tick and renders the alert.
    pub fn take_error(&mut self) -> Option<StoreError> {
        self.last_error.take()
    }

    /// Bind to a principal: cancel any held subscription and enter
    /// `Subscribing`. The first snapshot (delivered even when the result
    /// is empty) moves the view to `Live` on the next [`poll`].
    ///
    /// [`poll`]: Self::poll
    pub async fn bind(&mut self, principal: &Principal) {
        self.owner = Some(principal.uid.clone());
        self.resubscribe().await;
    }

    /// Tear down: cancel the subscription, discard the snapshot, return
    /// to `Idle`. Called when the principal is cleared.
    pub fn unbind(&mut self) {
        self.cancel_subscription();
        self.owner = None;
        self.all_tasks.clear();
        self.visible.clear();
        self.phase = ViewPhase::Idle;
    }

    /// Explicitly re-enter `Subscribing` (after `Error`). No-op when no
    /// principal is bound.
    pub async fn refresh(&mut self) {
        if self.owner.is_some() {
            self.resubscribe().await;
        }
    }

    async fn resubscribe(&mut self) {
        self.cancel_subscription();
        let Some(owner) = self.owner.clone() else {
            return;
        };
        self.phase = ViewPhase::Subscribing;
        match self.store.subscribe(&owner, self.completed_filter).await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                tracing::warn!(
                    owner = %owner,
                    completed = self.completed_filter,
                    error = %e,
                    "subscribe failed"
                );
                self.last_error = Some(e);
                self.phase = ViewPhase::Error;
            }
        }
    }

    fn cancel_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Drain both mailboxes on the caller's thread. This is the only
    /// place snapshot and outcome state is applied.
    pub fn poll(&mut self) {
        let mut events = Vec::new();
        if let Some(subscription) = self.subscription.as_mut() {
            while let Some(event) = subscription.try_next() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                StoreEvent::Snapshot(tasks) => {
                    self.all_tasks = tasks;
                    self.recompute_visible();
                    self.phase = ViewPhase::Live;
                }
                StoreEvent::Error(err) => self.handle_subscription_error(err),
            }
        }

        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome {
                MutationOutcome::Create(result) => {
                    // in_flight clears on every outcome, success or not.
                    self.in_flight = false;
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "create failed");
                        self.last_error = Some(e);
                    }
                }
                MutationOutcome::Toggle(result) => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "completion toggle failed");
                        self.last_error = Some(e);
                    }
                }
                MutationOutcome::Destroy(result) => match result {
                    // A second delete of the same id reports NotFound;
                    // treated as success.
                    Ok(()) | Err(StoreError::NotFound(_)) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "delete failed");
                        self.last_error = Some(e);
                    }
                },
            }
        }
    }

    fn handle_subscription_error(&mut self, err: StoreError) {
        if matches!(err, StoreError::Unauthenticated) {
            // Session lost: tear the subscription down and wait for the
            // next auth transition (or an explicit refresh).
            self.cancel_subscription();
            self.phase = ViewPhase::Error;
        } else if self.phase == ViewPhase::Subscribing {
            self.phase = ViewPhase::Error;
        }
        // While Live, a Network/PermissionDenied/Internal error is an
        // alert only; the resumed subscription reconciles state.
        self.last_error = Some(err);
    }

    /// Assign the query (trimmed, lowercased) and recompute the visible
    /// list. Purely local.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
        self.recompute_visible();
    }

    /// Switch input mode. Leaving search clears the query, so the visible
    /// list returns to the full snapshot.
    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        if mode != InputMode::Search && !self.query.is_empty() {
            self.query.clear();
            self.recompute_visible();
        }
    }

    /// Create a task. Valid only on the pending view; silently no-ops when
    /// the trimmed text is empty or a create is already in flight (the
    /// empty-text policy is a pre-check, not an error).
    ///
    /// No optimistic insert: the subscription delivers the new task.
    pub fn create(&mut self, text: &str) {
        if self.completed_filter {
            return;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() || self.in_flight {
            return;
        }
        let Some(owner) = self.owner.clone() else {
            return;
        };
        self.in_flight = true;
        let store = Arc::clone(&self.store);
        let outcome_tx = self.outcome_tx.clone();
        let text = trimmed.to_string();
        tokio::spawn(async move {
            let result = store.add(&owner, &text).await;
            let _ = outcome_tx.send(MutationOutcome::Create(result)).await;
        });
    }

    /// Mark a task completed.
    pub fn complete(&mut self, id: &TaskId) {
        self.spawn_set_completed(id, true);
    }

    /// Mark a task not completed.
    pub fn uncomplete(&mut self, id: &TaskId) {
        self.spawn_set_completed(id, false);
    }

    fn spawn_set_completed(&self, id: &TaskId, completed: bool) {
        let store = Arc::clone(&self.store);
        let outcome_tx = self.outcome_tx.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let result = store.set_completed(&id, completed).await;
            let _ = outcome_tx.send(MutationOutcome::Toggle(result)).await;
        });
    }

    /// Delete a task. Any confirmation dialog is the presenter's job;
    /// by the time this is called the decision is made.
    pub fn destroy(&mut self, id: &TaskId) {
        let store = Arc::clone(&self.store);
        let outcome_tx = self.outcome_tx.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let result = store.remove(&id).await;
            let _ = outcome_tx.send(MutationOutcome::Destroy(result)).await;
        });
    }

    fn recompute_visible(&mut self) {
        self.visible = filter_tasks(&self.all_tasks, &self.query);
    }
}
