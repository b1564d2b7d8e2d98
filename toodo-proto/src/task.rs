//! Task domain types for `TooDo`.
//!
//! A [`Task`] is one to-do item owned by a single principal. Identifiers
//! and creation timestamps are assigned server-side; clients never mint
//! them for persisted tasks. Snapshots delivered by the store adapter are
//! ordered newest first with a stable id tie-break (see
//! [`sort_newest_first`]).

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Maximum allowed task text length in characters.
pub const MAX_TASK_TEXT_LENGTH: usize = 256;

/// Opaque server-assigned task identifier, unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Create a task identifier from its string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this task ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation failures for task text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskTextError {
    /// The text is empty after trimming.
    #[error("task text cannot be empty")]
    Empty,
    /// The text exceeds [`MAX_TASK_TEXT_LENGTH`] characters after trimming.
    #[error("task text too long (max {MAX_TASK_TEXT_LENGTH} characters)")]
    TooLong,
}

/// Validates task text and returns the trimmed value.
///
/// Every persisted task satisfies `validate_text` — the store adapter trims
/// on write and rejects empty or oversized input before it reaches the
/// server.
///
/// # Errors
///
/// Returns [`TaskTextError::Empty`] when the trimmed text is empty, or
/// [`TaskTextError::TooLong`] when it exceeds [`MAX_TASK_TEXT_LENGTH`]
/// characters.
pub fn validate_text(text: &str) -> Result<&str, TaskTextError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskTextError::Empty);
    }
    if trimmed.chars().count() > MAX_TASK_TEXT_LENGTH {
        return Err(TaskTextError::TooLong);
    }
    Ok(trimmed)
}

/// One to-do item as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// User text, trimmed and non-empty.
    pub text: String,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Server-generated creation instant (milliseconds since epoch).
    /// Never changes after insert.
    pub created_at: u64,
    /// The principal that created the task. Never changes.
    pub owner_id: UserId,
}

/// Sorts a snapshot newest first: `created_at` descending, ties broken by
/// `id` ascending.
///
/// The server orders by `created_at` only; the id tie-break is applied
/// client-side so rows sharing a timestamp do not reshuffle between
/// snapshots.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}
