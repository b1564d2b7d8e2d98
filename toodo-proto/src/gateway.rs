//! Wire frames for the document gateway's listen channel.
//!
//! Live queries ride a WebSocket connection to the hosted document store.
//! The client authenticates the channel with [`ClientFrame::Hello`], opens
//! watches with [`ClientFrame::Listen`], and receives full-snapshot
//! [`ServerFrame::Snapshot`] frames whenever a watched query changes.
//! Frames are JSON text, tagged by a `type` field.
//!
//! A snapshot's `tasks` field may be `null` — the platform occasionally
//! emits an empty result that carries no list at all. The adapter drops
//! those silently (logged, never surfaced).

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::user::UserId;

/// Frames sent from the client to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Authenticate the listen channel with a session access token.
    Hello {
        /// Bearer token obtained from the identity service.
        token: String,
    },
    /// Open a live query. Snapshots for it are tagged with `watch_id`.
    Listen {
        /// Client-chosen identifier for this watch.
        watch_id: u64,
        /// The query to watch.
        query: TaskQuery,
    },
    /// Close a previously opened live query.
    Unlisten {
        /// The watch to close.
        watch_id: u64,
    },
}

/// The one query shape the task collection supports:
/// `owner_id = $u AND completed = $c ORDER BY created_at DESC`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Owner whose tasks are watched.
    pub owner_id: UserId,
    /// Completion flag partition.
    pub completed: bool,
}

/// Frames sent from the gateway to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// The listen channel is authenticated.
    HelloAck {
        /// The account the token resolved to.
        uid: UserId,
    },
    /// A full snapshot for one watch. `tasks: null` is the platform's
    /// null-result quirk and must be dropped by the receiver.
    Snapshot {
        /// The watch this snapshot belongs to.
        watch_id: u64,
        /// Complete result set, or `null` (see module docs).
        tasks: Option<Vec<Task>>,
    },
    /// A watch failed server-side; no further snapshots will arrive for it.
    ListenError {
        /// The watch that failed.
        watch_id: u64,
        /// Machine-readable failure kind.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
    /// A channel-level failure not tied to a single watch.
    Error {
        /// Machine-readable failure kind.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

/// Failure kinds the gateway reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The token is missing, expired, or invalid.
    Unauthenticated,
    /// The token does not grant access to the requested documents.
    PermissionDenied,
    /// The referenced document does not exist.
    NotFound,
    /// Any other server-side failure.
    Internal,
}

/// Error type for frame encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("frame serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`ClientFrame`] as a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the frame cannot be serialized.
pub fn encode_client(frame: &ClientFrame) -> Result<String, CodecError> {
    serde_json::to_string(frame).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`ClientFrame`] from a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the text is not a valid frame.
pub fn decode_client(text: &str) -> Result<ClientFrame, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a [`ServerFrame`] as a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the frame cannot be serialized.
pub fn encode_server(frame: &ServerFrame) -> Result<String, CodecError> {
    serde_json::to_string(frame).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`ServerFrame`] from a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the text is not a valid frame.
pub fn decode_server(text: &str) -> Result<ServerFrame, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Serialization(e.to_string()))
}
