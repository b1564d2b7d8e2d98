//! Integration tests for the task synchronization and filter view.
//!
//! Exercises the view-models end to end against the in-memory store:
//! create round-trips, query filtering, mode toggles, completion moving
//! tasks between the pending and done views, and the guard rails around
//! empty text and double deletes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use toodo::store::memory::InMemoryStore;
use toodo::store::{StoreError, TaskStore};
use toodo::views::{InputMode, TaskListView, ViewPhase};
use toodo_proto::task::{Task, TaskId};
use toodo_proto::user::{Principal, UserId};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn principal() -> Principal {
    Principal {
        uid: UserId::new("u-1"),
        email: "alice@example.com".to_string(),
        created_at: 0,
        last_sign_in: 0,
    }
}

fn make_task(id: &str, text: &str, completed: bool, created_at: u64) -> Task {
    Task {
        id: TaskId::new(id),
        text: text.to_string(),
        completed,
        created_at,
        owner_id: UserId::new("u-1"),
    }
}

/// Polls `view` until `condition` holds or a deadline passes.
async fn settle<S: TaskStore + 'static>(
    view: &mut TaskListView<S>,
    condition: impl Fn(&TaskListView<S>) -> bool,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        view.poll();
        if condition(view) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "view did not settle in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn live_pending_view(store: &Arc<InMemoryStore>) -> TaskListView<InMemoryStore> {
    let mut view = TaskListView::new(Arc::clone(store), false);
    view.bind(&principal()).await;
    settle(&mut view, |v| v.phase() == ViewPhase::Live).await;
    view
}

async fn live_done_view(store: &Arc<InMemoryStore>) -> TaskListView<InMemoryStore> {
    let mut view = TaskListView::new(Arc::clone(store), true);
    view.bind(&principal()).await;
    settle(&mut view, |v| v.phase() == ViewPhase::Live).await;
    view
}

// ---------------------------------------------------------------------------
// Scenario 1: create round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_round_trip() {
    let store = Arc::new(InMemoryStore::new());
    let mut view = live_pending_view(&store).await;
    assert!(view.all_tasks().is_empty());

    view.create("Buy milk");
    settle(&mut view, |v| !v.in_flight() && v.visible().len() == 1).await;

    let task = &view.visible()[0];
    assert_eq!(task.text, "Buy milk");
    assert!(!task.completed);
    assert_eq!(task.owner_id, UserId::new("u-1"));
}

#[tokio::test]
async fn create_trims_surrounding_whitespace() {
    let store = Arc::new(InMemoryStore::new());
    let mut view = live_pending_view(&store).await;

    view.create("  hi  ");
    settle(&mut view, |v| v.visible().len() == 1).await;
    assert_eq!(view.visible()[0].text, "hi");
}

// ---------------------------------------------------------------------------
// Scenario 2 + 3: filter and mode toggle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filter_matches_case_insensitively_preserving_order() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_task(make_task("a", "Buy milk", false, 300));
    store.seed_task(make_task("b", "Call mom", false, 200));
    store.seed_task(make_task("c", "milk run", false, 100));

    let mut view = live_pending_view(&store).await;
    settle(&mut view, |v| v.all_tasks().len() == 3).await;

    view.set_query("MILK");
    let ids: Vec<&str> = view.visible().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["a", "c"]);
}

#[tokio::test]
async fn mode_toggle_clears_query_and_restores_visible() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_task(make_task("a", "Buy milk", false, 300));
    store.seed_task(make_task("b", "Call mom", false, 200));
    store.seed_task(make_task("c", "milk run", false, 100));

    let mut view = live_pending_view(&store).await;
    settle(&mut view, |v| v.all_tasks().len() == 3).await;

    view.set_mode(InputMode::Search);
    view.set_query("MILK");
    assert_eq!(view.visible().len(), 2);

    view.set_mode(InputMode::Compose);
    assert_eq!(view.query(), "");
    assert_eq!(view.visible(), view.all_tasks());
}

#[tokio::test]
async fn visible_is_a_subsequence_of_all_tasks() {
    let store = Arc::new(InMemoryStore::new());
    for (id, text) in [("a", "x one"), ("b", "two"), ("c", "x three"), ("d", "four x")] {
        store.seed_task(make_task(id, text, false, 100));
    }
    let mut view = live_pending_view(&store).await;
    settle(&mut view, |v| v.all_tasks().len() == 4).await;

    view.set_query("x");
    let all: Vec<&str> = view.all_tasks().iter().map(|t| t.id.as_str()).collect();
    let visible: Vec<&str> = view.visible().iter().map(|t| t.id.as_str()).collect();

    // Order-preserving subsequence: every visible id appears in all_tasks
    // in the same relative order, without duplication.
    let mut cursor = all.iter();
    for id in &visible {
        assert!(
            cursor.any(|candidate| candidate == id),
            "visible id {id} out of order or duplicated"
        );
    }
}

// ---------------------------------------------------------------------------
// Scenario 4: completion moves tasks between view-models
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completing_a_task_moves_it_to_the_done_view() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_task(make_task("a", "Finish the report", false, 100));

    let mut pending = live_pending_view(&store).await;
    let mut done = live_done_view(&store).await;
    settle(&mut pending, |v| v.all_tasks().len() == 1).await;
    assert!(done.all_tasks().is_empty());

    pending.complete(&TaskId::new("a"));

    settle(&mut pending, |v| v.all_tasks().is_empty()).await;
    settle(&mut done, |v| v.all_tasks().len() == 1).await;
    assert!(done.all_tasks()[0].completed);
    assert_eq!(done.all_tasks()[0].id.as_str(), "a");
}

#[tokio::test]
async fn complete_then_uncomplete_returns_the_task() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_task(make_task("a", "Gym", false, 100));

    let mut pending = live_pending_view(&store).await;
    let mut done = live_done_view(&store).await;
    settle(&mut pending, |v| v.all_tasks().len() == 1).await;

    pending.complete(&TaskId::new("a"));
    settle(&mut done, |v| v.all_tasks().len() == 1).await;

    done.uncomplete(&TaskId::new("a"));
    settle(&mut done, |v| v.all_tasks().is_empty()).await;
    settle(&mut pending, |v| v.all_tasks().len() == 1).await;
    assert!(!pending.all_tasks()[0].completed);
}

// ---------------------------------------------------------------------------
// Scenario 6 + idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_text_create_never_reaches_the_store() {
    let store = Arc::new(InMemoryStore::new());
    let mut view = live_pending_view(&store).await;

    view.create("   ");
    assert!(!view.in_flight());
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.poll();
    assert_eq!(store.write_calls(), 0);
    assert!(view.all_tasks().is_empty());
}

#[tokio::test]
async fn double_delete_surfaces_no_error() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_task(make_task("a", "Doomed", false, 100));
    let mut view = live_pending_view(&store).await;
    settle(&mut view, |v| v.all_tasks().len() == 1).await;

    view.destroy(&TaskId::new("a"));
    settle(&mut view, |v| v.all_tasks().is_empty()).await;

    view.destroy(&TaskId::new("a"));
    settle(&mut view, |_| store.write_calls() == 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.poll();
    assert!(view.take_error().is_none());
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshots_arrive_newest_first_with_stable_ties() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_task(make_task("b", "tie two", false, 100));
    store.seed_task(make_task("a", "tie one", false, 100));
    store.seed_task(make_task("c", "newest", false, 200));

    let mut view = live_pending_view(&store).await;
    settle(&mut view, |v| v.all_tasks().len() == 3).await;

    let ids: Vec<&str> = view.all_tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);
}

#[tokio::test]
async fn mutation_failure_is_surfaced_as_a_value() {
    let store = Arc::new(InMemoryStore::new());
    let mut view = live_pending_view(&store).await;

    store.fail_next_write(StoreError::PermissionDenied);
    view.create("not allowed");
    settle(&mut view, |v| !v.in_flight()).await;
    assert_eq!(view.take_error(), Some(StoreError::PermissionDenied));
    assert!(view.all_tasks().is_empty());
}
