//! Property-based round-trip tests for the gateway wire frames.
//!
//! Uses proptest to verify:
//! 1. Any valid `ClientFrame` / `ServerFrame` survives encode → decode.
//! 2. Random text never causes a panic in the decoders.
//! 3. `sort_newest_first` is idempotent and total.

use proptest::prelude::*;
use toodo_proto::gateway::{self, ClientFrame, ErrorCode, ServerFrame, TaskQuery};
use toodo_proto::task::{self, Task, TaskId};
use toodo_proto::user::UserId;

// --- Strategies for protocol types ---

/// Strategy for generating arbitrary `TaskId` values.
fn arb_task_id() -> impl Strategy<Value = TaskId> {
    "[a-zA-Z0-9-]{1,32}".prop_map(TaskId::new)
}

/// Strategy for generating arbitrary `UserId` values.
fn arb_user_id() -> impl Strategy<Value = UserId> {
    "[a-zA-Z0-9-]{1,32}".prop_map(UserId::new)
}

/// Strategy for generating arbitrary `Task` values.
fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_task_id(),
        "[^\x00]{1,64}",
        any::<bool>(),
        any::<u64>(),
        arb_user_id(),
    )
        .prop_map(|(id, text, completed, created_at, owner_id)| Task {
            id,
            text,
            completed,
            created_at,
            owner_id,
        })
}

/// Strategy for generating arbitrary `ErrorCode` values.
fn arb_error_code() -> impl Strategy<Value = ErrorCode> {
    prop_oneof![
        Just(ErrorCode::Unauthenticated),
        Just(ErrorCode::PermissionDenied),
        Just(ErrorCode::NotFound),
        Just(ErrorCode::Internal),
    ]
}

/// Strategy for generating arbitrary `ClientFrame` values.
fn arb_client_frame() -> impl Strategy<Value = ClientFrame> {
    prop_oneof![
        "[^\x00]{0,64}".prop_map(|token| ClientFrame::Hello { token }),
        (any::<u64>(), arb_user_id(), any::<bool>()).prop_map(|(watch_id, owner_id, completed)| {
            ClientFrame::Listen {
                watch_id,
                query: TaskQuery {
                    owner_id,
                    completed,
                },
            }
        }),
        any::<u64>().prop_map(|watch_id| ClientFrame::Unlisten { watch_id }),
    ]
}

/// Strategy for generating arbitrary `ServerFrame` values.
fn arb_server_frame() -> impl Strategy<Value = ServerFrame> {
    prop_oneof![
        arb_user_id().prop_map(|uid| ServerFrame::HelloAck { uid }),
        (
            any::<u64>(),
            prop::option::of(prop::collection::vec(arb_task(), 0..8))
        )
            .prop_map(|(watch_id, tasks)| ServerFrame::Snapshot { watch_id, tasks }),
        (any::<u64>(), arb_error_code(), "[^\x00]{0,64}").prop_map(
            |(watch_id, code, message)| ServerFrame::ListenError {
                watch_id,
                code,
                message,
            }
        ),
        (arb_error_code(), "[^\x00]{0,64}")
            .prop_map(|(code, message)| ServerFrame::Error { code, message }),
    ]
}

// --- Property tests ---

proptest! {
    /// Any valid ClientFrame survives an encode → decode round-trip.
    #[test]
    fn client_frame_round_trip(frame in arb_client_frame()) {
        let text = gateway::encode_client(&frame).expect("encode should succeed");
        let decoded = gateway::decode_client(&text).expect("decode should succeed");
        prop_assert_eq!(frame, decoded);
    }

    /// Any valid ServerFrame survives an encode → decode round-trip.
    #[test]
    fn server_frame_round_trip(frame in arb_server_frame()) {
        let text = gateway::encode_server(&frame).expect("encode should succeed");
        let decoded = gateway::decode_server(&text).expect("decode should succeed");
        prop_assert_eq!(frame, decoded);
    }

    /// Random text never causes a panic in the decoders.
    #[test]
    fn random_text_decode_no_panic(text in ".{0,256}") {
        let _ = gateway::decode_client(&text);
        let _ = gateway::decode_server(&text);
    }

    /// Sorting a snapshot is idempotent.
    #[test]
    fn sort_newest_first_is_idempotent(mut tasks in prop::collection::vec(arb_task(), 0..16)) {
        task::sort_newest_first(&mut tasks);
        let once = tasks.clone();
        task::sort_newest_first(&mut tasks);
        prop_assert_eq!(once, tasks);
    }

    /// Sorting never loses or invents tasks.
    #[test]
    fn sort_newest_first_is_a_permutation(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let mut sorted = tasks.clone();
        task::sort_newest_first(&mut sorted);
        prop_assert_eq!(sorted.len(), tasks.len());
        for t in &tasks {
            prop_assert!(sorted.contains(t));
        }
    }
}
