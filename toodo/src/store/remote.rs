//! Live gateway client for the hosted `TooDo` document store.
//!
//! Implements [`TaskStore`] against the real service: live queries ride a
//! WebSocket *listen channel* (authenticated once with a `Hello` frame,
//! then multiplexing any number of watches), while mutations go over
//! HTTPS/JSON with bearer authentication. Mutations carry no explicit
//! timeout — failures come from the underlying transport.
//!
//! The background reader task routes [`ServerFrame::Snapshot`] frames to
//! per-watch mailboxes by `watch_id`. Malformed frames are logged and
//! skipped, never fatal. Null snapshots (the platform's empty-result
//! quirk) are logged at debug level and dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use toodo_proto::gateway::{self, ClientFrame, ErrorCode, ServerFrame, TaskQuery};
use toodo_proto::task::{self, TaskId, TaskTextError};
use toodo_proto::user::UserId;

use super::{CancelToken, StoreError, StoreEvent, TaskStore, TaskSubscription};

/// Type alias for the write half of the listen channel.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of the listen channel.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the `Hello` / `HelloAck` handshake.
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

/// Mailbox capacity per watch.
const WATCH_BUFFER: usize = 32;

/// A registered watch on the listen channel.
struct WatchEntry {
    tx: mpsc::Sender<StoreEvent>,
    cancel: CancelToken,
}

type WatchMap = Arc<Mutex<HashMap<u64, WatchEntry>>>;

/// [`TaskStore`] implementation backed by the hosted document gateway.
///
/// Created via [`RemoteStore::connect`], which establishes and
/// authenticates the listen channel and spawns the background reader.
pub struct RemoteStore {
    /// Base URL for the mutation endpoints (no trailing slash).
    api_url: String,
    http: reqwest::Client,
    token: String,
    ws_sender: Arc<tokio::sync::Mutex<WsSender>>,
    watches: WatchMap,
    next_watch_id: AtomicU64,
    connected: Arc<AtomicBool>,
    /// Kept alive for the store's lifetime.
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl RemoteStore {
    /// Connect to the document gateway and authenticate the listen channel.
    ///
    /// Steps:
    /// 1. Establish the WebSocket connection to `gateway_url` (10s timeout)
    /// 2. Send a `Hello` frame carrying the session token
    /// 3. Wait for the `HelloAck` (5s timeout)
    /// 4. Spawn the background reader task
    ///
    /// # Errors
    ///
    /// - [`StoreError::Network`] if the connection or handshake times out
    ///   or the channel closes mid-handshake.
    /// - [`StoreError::Unauthenticated`] / [`StoreError::PermissionDenied`]
    ///   if the gateway rejects the token.
    /// - [`StoreError::Internal`] for malformed or unexpected handshake
    ///   frames and invalid URLs.
    pub async fn connect(
        gateway_url: &str,
        api_url: &str,
        token: &str,
    ) -> Result<Self, StoreError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| StoreError::Internal(format!("invalid api url {api_url}: {e}")))?;

        let (ws_stream, _response) =
            tokio::time::timeout(CONNECT_TIMEOUT, connect_async(gateway_url))
                .await
                .map_err(|_| {
                    tracing::warn!(url = gateway_url, "gateway connect timed out");
                    StoreError::Network("gateway connect timed out".to_string())
                })?
                .map_err(|e| {
                    tracing::warn!(url = gateway_url, err = %e, "gateway connect failed");
                    StoreError::Network(format!("gateway connect failed: {e}"))
                })?;

        let (mut ws_sender, mut ws_reader) = ws_stream.split();

        let hello = ClientFrame::Hello {
            token: token.to_string(),
        };
        let hello_text =
            gateway::encode_client(&hello).map_err(|e| StoreError::Internal(e.to_string()))?;
        ws_sender
            .send(Message::Text(hello_text.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send Hello frame");
                StoreError::Network(format!("failed to send Hello: {e}"))
            })?;

        let ack = tokio::time::timeout(HELLO_TIMEOUT, ws_reader.next())
            .await
            .map_err(|_| {
                tracing::warn!(url = gateway_url, "gateway handshake timed out");
                StoreError::Network("gateway handshake timed out".to_string())
            })?;

        match ack {
            Some(Ok(Message::Text(text))) => match gateway::decode_server(&text) {
                Ok(ServerFrame::HelloAck { uid }) => {
                    tracing::info!(uid = %uid, url = gateway_url, "listen channel authenticated");
                }
                Ok(ServerFrame::Error { code, message }) => {
                    tracing::warn!(?code, detail = %message, "gateway rejected handshake");
                    return Err(map_error_code(code, message));
                }
                Ok(other) => {
                    tracing::warn!(?other, "unexpected frame during handshake");
                    return Err(StoreError::Internal(
                        "unexpected frame during handshake".to_string(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed handshake frame");
                    return Err(StoreError::Internal(format!(
                        "malformed handshake frame: {e}"
                    )));
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                tracing::warn!("gateway closed the channel during handshake");
                return Err(StoreError::Network(
                    "gateway closed during handshake".to_string(),
                ));
            }
            Some(Ok(_)) => {
                return Err(StoreError::Internal(
                    "unexpected non-text frame during handshake".to_string(),
                ));
            }
            Some(Err(e)) => {
                return Err(StoreError::Network(format!(
                    "gateway error during handshake: {e}"
                )));
            }
        }

        let ws_sender = Arc::new(tokio::sync::Mutex::new(ws_sender));
        let watches: WatchMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let reader_handle = tokio::spawn(reader_loop(
            ws_reader,
            Arc::clone(&ws_sender),
            Arc::clone(&watches),
            Arc::clone(&connected),
        ));

        Ok(Self {
            api_url: api_url.as_str().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: token.to_string(),
            ws_sender,
            watches,
            next_watch_id: AtomicU64::new(1),
            connected,
            _reader_handle: reader_handle,
        })
    }

    /// Whether the listen channel is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn tasks_url(&self) -> String {
        format!("{}/v1/tasks", self.api_url)
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/v1/tasks/{}", self.api_url, id)
    }

    async fn send_frame(&self, frame: &ClientFrame) -> Result<(), StoreError> {
        let text = gateway::encode_client(frame).map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut sender = self.ws_sender.lock().await;
        sender.send(Message::Text(text.into())).await.map_err(|e| {
            tracing::warn!(err = %e, "listen channel send failed");
            self.connected.store(false, Ordering::Relaxed);
            StoreError::Network("listen channel closed".to_string())
        })
    }
}

impl TaskStore for RemoteStore {
    async fn subscribe(
        &self,
        owner: &UserId,
        completed: bool,
    ) -> Result<TaskSubscription, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Network("listen channel closed".to_string()));
        }

        let watch_id = self.next_watch_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let cancel = CancelToken::new();
        self.watches.lock().insert(
            watch_id,
            WatchEntry {
                tx,
                cancel: cancel.clone(),
            },
        );

        let frame = ClientFrame::Listen {
            watch_id,
            query: TaskQuery {
                owner_id: owner.clone(),
                completed,
            },
        };
        if let Err(e) = self.send_frame(&frame).await {
            self.watches.lock().remove(&watch_id);
            return Err(e);
        }

        tracing::debug!(watch_id, owner = %owner, completed, "watch opened");
        Ok(TaskSubscription::new(rx, cancel))
    }

    async fn add(&self, owner: &UserId, text: &str) -> Result<(), StoreError> {
        let trimmed = task::validate_text(text).map_err(|e| match e {
            TaskTextError::Empty => StoreError::EmptyText,
            TaskTextError::TooLong => StoreError::Internal(e.to_string()),
        })?;
        let body = CreateTaskBody {
            text: trimmed,
            owner_id: owner,
        };
        let response = self
            .http
            .post(self.tasks_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn set_completed(&self, id: &TaskId, completed: bool) -> Result<(), StoreError> {
        let response = self
            .http
            .patch(self.task_url(id))
            .bearer_auth(&self.token)
            .json(&UpdateCompletedBody { completed })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn remove(&self, id: &TaskId) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.task_url(id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }
}

/// Body for `POST /v1/tasks`. The server assigns `id` and `created_at`
/// and validates that `owner_id` matches the token.
#[derive(serde::Serialize)]
struct CreateTaskBody<'a> {
    text: &'a str,
    owner_id: &'a UserId,
}

/// Body for `PATCH /v1/tasks/{id}` — only the completion flag changes.
#[derive(serde::Serialize)]
struct UpdateCompletedBody {
    completed: bool,
}

/// Background task that reads listen-channel frames and dispatches them.
///
/// Snapshots are sorted client-side (id tie-break) before delivery.
/// Watches whose subscription was cancelled are removed lazily here, with
/// an `Unlisten` sent to the gateway. When the channel goes down, every
/// remaining live watch receives a `Network` error event.
async fn reader_loop(
    mut ws_reader: WsReader,
    ws_sender: Arc<tokio::sync::Mutex<WsSender>>,
    watches: WatchMap,
    connected: Arc<AtomicBool>,
) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match gateway::decode_server(&text) {
                Ok(ServerFrame::Snapshot { watch_id, tasks }) => {
                    let Some(mut tasks) = tasks else {
                        // Platform quirk: the live query emitted a null
                        // result. Dropped, pending characterization.
                        tracing::debug!(watch_id, "null snapshot dropped");
                        continue;
                    };
                    task::sort_newest_first(&mut tasks);
                    dispatch(&ws_sender, &watches, watch_id, StoreEvent::Snapshot(tasks));
                }
                Ok(ServerFrame::ListenError {
                    watch_id,
                    code,
                    message,
                }) => {
                    tracing::warn!(watch_id, ?code, detail = %message, "watch failed server-side");
                    let err = map_error_code(code, message);
                    dispatch(&ws_sender, &watches, watch_id, StoreEvent::Error(err));
                }
                Ok(ServerFrame::Error { code, message }) => {
                    tracing::warn!(?code, detail = %message, "gateway channel error");
                }
                Ok(other) => {
                    tracing::debug!(?other, "unexpected gateway frame");
                }
                Err(e) => {
                    // Malformed frame: log and skip, don't disconnect.
                    tracing::warn!(err = %e, "malformed gateway frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("gateway closed the listen channel");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!(err = %e, "listen channel read error");
                break;
            }
        }
    }

    connected.store(false, Ordering::Relaxed);
    // Losing the channel is a network failure for every live watch.
    let entries: Vec<WatchEntry> = {
        let mut guard = watches.lock();
        guard.drain().map(|(_, entry)| entry).collect()
    };
    for entry in entries {
        if !entry.cancel.is_cancelled() {
            let _ = entry.tx.try_send(StoreEvent::Error(StoreError::Network(
                "listen channel closed".to_string(),
            )));
        }
    }
    tracing::info!("gateway reader task exiting");
}

/// Route an event to its watch, pruning cancelled watches.
fn dispatch(
    ws_sender: &Arc<tokio::sync::Mutex<WsSender>>,
    watches: &WatchMap,
    watch_id: u64,
    event: StoreEvent,
) {
    let cancelled = {
        let guard = watches.lock();
        match guard.get(&watch_id) {
            Some(entry) if entry.cancel.is_cancelled() => true,
            Some(entry) => {
                let _ = entry.tx.try_send(event);
                return;
            }
            None => {
                tracing::debug!(watch_id, "frame for unknown watch");
                return;
            }
        }
    };
    if cancelled {
        watches.lock().remove(&watch_id);
        let sender = Arc::clone(ws_sender);
        tokio::spawn(async move {
            if let Ok(text) = gateway::encode_client(&ClientFrame::Unlisten { watch_id }) {
                let _ = sender.lock().await.send(Message::Text(text.into())).await;
            }
        });
        tracing::debug!(watch_id, "cancelled watch closed");
    }
}

/// Map a gateway [`ErrorCode`] to the adapter taxonomy.
fn map_error_code(code: ErrorCode, message: String) -> StoreError {
    match code {
        ErrorCode::Unauthenticated => StoreError::Unauthenticated,
        ErrorCode::PermissionDenied => StoreError::PermissionDenied,
        ErrorCode::NotFound => StoreError::NotFound(message),
        ErrorCode::Internal => StoreError::Internal(message),
    }
}

/// Map a reqwest transport error to the adapter taxonomy.
fn map_reqwest_error(err: reqwest::Error) -> StoreError {
    StoreError::Network(err.to_string())
}

/// Translate a mutation response status into a result.
async fn check_status(response: reqwest::Response) -> Result<(), StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(map_http_status(status, &message))
}

/// Map an HTTP status from the mutation endpoints to the adapter taxonomy.
fn map_http_status(status: reqwest::StatusCode, message: &str) -> StoreError {
    match status.as_u16() {
        401 => StoreError::Unauthenticated,
        403 => StoreError::PermissionDenied,
        404 => StoreError::NotFound(message.to_string()),
        500..=599 => StoreError::Internal(format!("server error {status}: {message}")),
        _ => StoreError::Internal(format!("unexpected status {status}: {message}")),
    }
}
