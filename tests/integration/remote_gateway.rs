//! Integration tests for `RemoteStore` against an in-process stub gateway.
//!
//! Each test runs a scripted WebSocket server: accept one connection,
//! perform the `Hello` / `HelloAck` handshake, then follow the script
//! (deliver snapshots, fail, close). This exercises the listen-channel
//! side of the adapter; the HTTP mutation mapping is unit-tested in the
//! adapter module.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use toodo::store::remote::RemoteStore;
use toodo::store::{StoreError, StoreEvent, TaskStore};
use toodo_proto::gateway::{self, ClientFrame, ErrorCode, ServerFrame};
use toodo_proto::task::{Task, TaskId};
use toodo_proto::user::UserId;

/// Unused by the subscription tests; must only parse.
const API_URL: &str = "http://127.0.0.1:9";

type ServerWs = WebSocketStream<TcpStream>;

// ---------------------------------------------------------------------------
// Stub gateway helpers
// ---------------------------------------------------------------------------

/// Start a one-connection stub gateway running `script` after accept.
async fn spawn_gateway<F, Fut>(script: F) -> (String, tokio::task::JoinHandle<()>)
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("ws://{addr}");

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        script(ws).await;
    });

    (url, handle)
}

/// Read the next text frame and decode it as a [`ClientFrame`].
async fn read_client_frame(ws: &mut ServerWs) -> ClientFrame {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return gateway::decode_client(&text).unwrap(),
            Some(Ok(_)) => {}
            other => panic!("expected client frame, got {other:?}"),
        }
    }
}

/// Send a [`ServerFrame`] as a text frame.
async fn send_server_frame(ws: &mut ServerWs, frame: &ServerFrame) {
    let text = gateway::encode_server(frame).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

/// Perform the server side of the handshake; returns the presented token.
async fn handshake(ws: &mut ServerWs) -> String {
    let frame = read_client_frame(ws).await;
    let ClientFrame::Hello { token } = frame else {
        panic!("expected Hello, got {frame:?}");
    };
    send_server_frame(
        ws,
        &ServerFrame::HelloAck {
            uid: UserId::new("u-1"),
        },
    )
    .await;
    token
}

/// Wait until the client hangs up, so the connection outlives the test
/// body instead of closing as soon as the script returns.
async fn hold_open(ws: &mut ServerWs) {
    while let Some(Ok(_)) = ws.next().await {}
}

fn make_task(id: &str, text: &str, created_at: u64) -> Task {
    Task {
        id: TaskId::new(id),
        text: text.to_string(),
        completed: false,
        created_at,
        owner_id: UserId::new("u-1"),
    }
}

async fn next_event_with_timeout(
    sub: &mut toodo::store::TaskSubscription,
) -> Option<StoreEvent> {
    tokio::time::timeout(Duration::from_secs(5), sub.next_event())
        .await
        .expect("timed out waiting for store event")
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_performs_hello_handshake() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        let token = handshake(&mut ws).await;
        assert_eq!(token, "tok-1");
        hold_open(&mut ws).await;
    })
    .await;

    let store = RemoteStore::connect(&url, API_URL, "tok-1").await;
    assert!(store.is_ok(), "connect failed: {:?}", store.err());
    assert!(store.unwrap().is_connected());
}

#[tokio::test]
async fn rejected_token_maps_to_unauthenticated() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        let _hello = read_client_frame(&mut ws).await;
        send_server_frame(
            &mut ws,
            &ServerFrame::Error {
                code: ErrorCode::Unauthenticated,
                message: "expired token".to_string(),
            },
        )
        .await;
    })
    .await;

    let result = RemoteStore::connect(&url, API_URL, "stale").await;
    assert!(matches!(result, Err(StoreError::Unauthenticated)));
}

#[tokio::test]
async fn connect_to_nothing_is_a_network_error() {
    let result = RemoteStore::connect("ws://127.0.0.1:1", API_URL, "tok").await;
    assert!(matches!(result, Err(StoreError::Network(_))));
}

#[tokio::test]
async fn invalid_api_url_is_rejected_before_dialing() {
    let result = RemoteStore::connect("ws://127.0.0.1:1", "not a url", "tok").await;
    assert!(matches!(result, Err(StoreError::Internal(_))));
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshots_are_routed_in_order_and_sorted() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        handshake(&mut ws).await;
        let frame = read_client_frame(&mut ws).await;
        let ClientFrame::Listen { watch_id, query } = frame else {
            panic!("expected Listen, got {frame:?}");
        };
        assert_eq!(query.owner_id, UserId::new("u-1"));
        assert!(!query.completed);

        // Deliberately unsorted; the adapter applies newest-first with
        // the id tie-break.
        send_server_frame(
            &mut ws,
            &ServerFrame::Snapshot {
                watch_id,
                tasks: Some(vec![
                    make_task("z", "tie two", 100),
                    make_task("c", "newest", 200),
                    make_task("a", "tie one", 100),
                ]),
            },
        )
        .await;
        send_server_frame(
            &mut ws,
            &ServerFrame::Snapshot {
                watch_id,
                tasks: Some(vec![]),
            },
        )
        .await;
        hold_open(&mut ws).await;
    })
    .await;

    let store = RemoteStore::connect(&url, API_URL, "tok").await.unwrap();
    let mut sub = store.subscribe(&UserId::new("u-1"), false).await.unwrap();

    match next_event_with_timeout(&mut sub).await {
        Some(StoreEvent::Snapshot(tasks)) => {
            let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
            assert_eq!(ids, ["c", "a", "z"]);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
    assert_eq!(
        next_event_with_timeout(&mut sub).await,
        Some(StoreEvent::Snapshot(vec![]))
    );
}

#[tokio::test]
async fn null_snapshots_are_dropped_silently() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        handshake(&mut ws).await;
        let ClientFrame::Listen { watch_id, .. } = read_client_frame(&mut ws).await else {
            panic!("expected Listen");
        };
        // The platform's null-result quirk, then a real snapshot.
        send_server_frame(&mut ws, &ServerFrame::Snapshot { watch_id, tasks: None }).await;
        send_server_frame(
            &mut ws,
            &ServerFrame::Snapshot {
                watch_id,
                tasks: Some(vec![make_task("a", "real", 100)]),
            },
        )
        .await;
        hold_open(&mut ws).await;
    })
    .await;

    let store = RemoteStore::connect(&url, API_URL, "tok").await.unwrap();
    let mut sub = store.subscribe(&UserId::new("u-1"), false).await.unwrap();

    // The first observable event is the real snapshot.
    match next_event_with_timeout(&mut sub).await {
        Some(StoreEvent::Snapshot(tasks)) => {
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].id.as_str(), "a");
        }
        other => panic!("expected the non-null snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn listen_error_is_delivered_to_the_right_watch() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        handshake(&mut ws).await;
        let ClientFrame::Listen { watch_id, .. } = read_client_frame(&mut ws).await else {
            panic!("expected Listen");
        };
        send_server_frame(
            &mut ws,
            &ServerFrame::ListenError {
                watch_id,
                code: ErrorCode::PermissionDenied,
                message: "rules changed".to_string(),
            },
        )
        .await;
        hold_open(&mut ws).await;
    })
    .await;

    let store = RemoteStore::connect(&url, API_URL, "tok").await.unwrap();
    let mut sub = store.subscribe(&UserId::new("u-1"), false).await.unwrap();

    assert_eq!(
        next_event_with_timeout(&mut sub).await,
        Some(StoreEvent::Error(StoreError::PermissionDenied))
    );
}

// ---------------------------------------------------------------------------
// Channel loss
// ---------------------------------------------------------------------------

#[tokio::test]
async fn channel_close_surfaces_network_error_to_live_watches() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        handshake(&mut ws).await;
        let ClientFrame::Listen { watch_id, .. } = read_client_frame(&mut ws).await else {
            panic!("expected Listen");
        };
        send_server_frame(
            &mut ws,
            &ServerFrame::Snapshot {
                watch_id,
                tasks: Some(vec![]),
            },
        )
        .await;
        // Server goes away.
        let _ = ws.close(None).await;
    })
    .await;

    let store = RemoteStore::connect(&url, API_URL, "tok").await.unwrap();
    let mut sub = store.subscribe(&UserId::new("u-1"), false).await.unwrap();

    assert_eq!(
        next_event_with_timeout(&mut sub).await,
        Some(StoreEvent::Snapshot(vec![]))
    );
    match next_event_with_timeout(&mut sub).await {
        Some(StoreEvent::Error(StoreError::Network(_))) | None => {}
        other => panic!("expected network error after close, got {other:?}"),
    }

    // The store knows the channel is gone; new subscriptions fail fast.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while store.is_connected() {
        assert!(tokio::time::Instant::now() < deadline, "close not detected");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let result = store.subscribe(&UserId::new("u-1"), true).await;
    assert!(matches!(result, Err(StoreError::Network(_))));
}

#[tokio::test]
async fn cancelled_subscription_stops_observing() {
    let (url, _handle) = spawn_gateway(|mut ws| async move {
        handshake(&mut ws).await;
        let ClientFrame::Listen { watch_id, .. } = read_client_frame(&mut ws).await else {
            panic!("expected Listen");
        };
        send_server_frame(
            &mut ws,
            &ServerFrame::Snapshot {
                watch_id,
                tasks: Some(vec![]),
            },
        )
        .await;
        send_server_frame(
            &mut ws,
            &ServerFrame::Snapshot {
                watch_id,
                tasks: Some(vec![make_task("late", "after cancel", 100)]),
            },
        )
        .await;
        hold_open(&mut ws).await;
    })
    .await;

    let store = RemoteStore::connect(&url, API_URL, "tok").await.unwrap();
    let mut sub = store.subscribe(&UserId::new("u-1"), false).await.unwrap();
    assert_eq!(
        next_event_with_timeout(&mut sub).await,
        Some(StoreEvent::Snapshot(vec![]))
    );

    sub.cancel();
    assert_eq!(sub.try_next(), None);
    assert_eq!(sub.next_event().await, None);
}
