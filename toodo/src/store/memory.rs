//! In-memory document store for tests and offline demo mode.
//!
//! [`InMemoryStore`] mimics the hosted store's observable behavior: every
//! mutation republishes a complete snapshot to each live watcher whose
//! query matches, ids are server-style opaque strings (time-ordered
//! UUID v7), and creation timestamps are a strictly monotonic server
//! clock. Test hooks allow seeding tasks, injecting failures, and
//! counting watchers and write calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use toodo_proto::task::{self, Task, TaskId, TaskTextError};
use toodo_proto::user::UserId;

use super::{CancelToken, StoreError, StoreEvent, TaskStore, TaskSubscription};

/// Mailbox capacity per watcher.
const WATCH_BUFFER: usize = 32;

/// A registered live query.
struct Watcher {
    owner: UserId,
    completed: bool,
    tx: mpsc::Sender<StoreEvent>,
    cancel: CancelToken,
}

impl Watcher {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<TaskId, Task>,
    watchers: Vec<Watcher>,
    /// Fake server clock (ms). Strictly monotonic so insertion order is
    /// recoverable from timestamps.
    clock: u64,
    write_calls: u64,
    fail_next_write: Option<StoreError>,
}

impl Inner {
    fn next_timestamp(&mut self) -> u64 {
        self.clock = now_ms().max(self.clock + 1);
        self.clock
    }

    fn snapshot_for(&self, owner: &UserId, completed: bool) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.owner_id == *owner && t.completed == completed)
            .cloned()
            .collect();
        task::sort_newest_first(&mut tasks);
        tasks
    }

    /// Republish full snapshots to every live watcher. Dead watchers are
    /// pruned here.
    fn publish(&mut self) {
        self.watchers.retain(Watcher::is_live);
        for watcher in &self.watchers {
            let snapshot = self.snapshot_for(&watcher.owner, watcher.completed);
            let _ = watcher.tx.try_send(StoreEvent::Snapshot(snapshot));
        }
    }

    fn take_injected_failure(&mut self) -> Result<(), StoreError> {
        match self.fail_next_write.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Returns the current wall clock in milliseconds since epoch.
fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

/// Deterministic in-process implementation of [`TaskStore`].
#[derive(Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task directly, bypassing validation and the server clock.
    /// Watchers receive a fresh snapshot. Test and demo seeding helper.
    pub fn seed_task(&self, task: Task) {
        let mut inner = self.inner.lock();
        inner.clock = inner.clock.max(task.created_at);
        inner.tasks.insert(task.id.clone(), task);
        inner.publish();
    }

    /// Number of live (not cancelled, not dropped) watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.watchers.retain(Watcher::is_live);
        inner.watchers.len()
    }

    /// Number of mutation calls (`add` / `set_completed` / `remove`) the
    /// adapter has received, including failed ones.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.inner.lock().write_calls
    }

    /// Number of stored tasks across all owners and partitions.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Make the next mutation call fail with `err`.
    pub fn fail_next_write(&self, err: StoreError) {
        self.inner.lock().fail_next_write = Some(err);
    }

    /// Push a subscription error to every live watcher, as the hosted
    /// platform does when a query fails mid-stream.
    pub fn emit_error(&self, err: &StoreError) {
        let mut inner = self.inner.lock();
        inner.watchers.retain(Watcher::is_live);
        for watcher in &inner.watchers {
            let _ = watcher.tx.try_send(StoreEvent::Error(err.clone()));
        }
    }
}

impl TaskStore for InMemoryStore {
    async fn subscribe(
        &self,
        owner: &UserId,
        completed: bool,
    ) -> Result<TaskSubscription, StoreError> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let cancel = CancelToken::new();
        let mut inner = self.inner.lock();
        // The first snapshot is delivered on subscription, even when empty.
        let snapshot = inner.snapshot_for(owner, completed);
        let _ = tx.try_send(StoreEvent::Snapshot(snapshot));
        inner.watchers.push(Watcher {
            owner: owner.clone(),
            completed,
            tx,
            cancel: cancel.clone(),
        });
        Ok(TaskSubscription::new(rx, cancel))
    }

    async fn add(&self, owner: &UserId, text: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.write_calls += 1;
        inner.take_injected_failure()?;
        let trimmed = task::validate_text(text).map_err(|e| match e {
            TaskTextError::Empty => StoreError::EmptyText,
            TaskTextError::TooLong => StoreError::Internal(e.to_string()),
        })?;
        let id = TaskId::new(Uuid::now_v7().to_string());
        let created_at = inner.next_timestamp();
        inner.tasks.insert(
            id.clone(),
            Task {
                id,
                text: trimmed.to_string(),
                completed: false,
                created_at,
                owner_id: owner.clone(),
            },
        );
        inner.publish();
        Ok(())
    }

    async fn set_completed(&self, id: &TaskId, completed: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.write_calls += 1;
        inner.take_injected_failure()?;
        match inner.tasks.get_mut(id) {
            Some(task) => {
                task.completed = completed;
                inner.publish();
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn remove(&self, id: &TaskId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.write_calls += 1;
        inner.take_injected_failure()?;
        if inner.tasks.remove(id).is_some() {
            inner.publish();
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}
