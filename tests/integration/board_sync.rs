//! Integration tests for keeping a board's mirror in step with the store.
//!
//! Covers snapshot replacement, dedup, orphan filtering, lists vanishing
//! mid-session, and the pending/confirmed cycle around rejected commits.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use taskboard::store::DocumentStore;
use taskboard::store::memory::MemoryStore;
use taskboard::sync::SyncEvent;
use taskboard::tasks::{Board, BoardError, BoardSettings, DragEvent, DragOutcome, Location, SyncState};
use taskboard_proto::batch::WriteBatch;
use taskboard_proto::document::Timestamp;
use taskboard_proto::list::{List, ListId};
use taskboard_proto::path;
use taskboard_proto::task::{Priority, Task, TaskDraft, TaskId};
use taskboard_proto::user::UserId;

const WAIT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn user() -> UserId {
    UserId::new("ann")
}

fn open(store: &Arc<MemoryStore>) -> Board<MemoryStore> {
    Board::open(Arc::clone(store), user(), BoardSettings::default()).unwrap()
}

/// Creates a list through `board` and waits until it shows up.
async fn add_list(board: &mut Board<MemoryStore>, name: &str) -> ListId {
    let id = board.add_list(name).await.unwrap();
    let wanted = id.clone();
    assert!(board.sync_until(|m| m.list(&wanted).is_some(), WAIT).await.unwrap());
    id
}

/// Appends tasks through `board`, waiting for each to be mirrored.
async fn add_tasks(board: &mut Board<MemoryStore>, list_id: &ListId, titles: &[&str]) {
    for title in titles {
        let expected = board.mirror().task_count(list_id) + 1;
        board.add_task(list_id, TaskDraft::titled(*title)).await.unwrap();
        let id = list_id.clone();
        assert!(board
            .sync_until(|m| m.task_count(&id) == expected, WAIT)
            .await
            .unwrap());
    }
}

fn titles(board: &Board<MemoryStore>, list_id: &ListId) -> Vec<String> {
    board
        .mirror()
        .tasks(list_id)
        .iter()
        .map(|t| t.title.clone())
        .collect()
}

fn raw_task(id: &str, list_id: &ListId, order: u32) -> Task {
    Task {
        id: TaskId::new(id),
        list_id: list_id.clone(),
        title: id.to_string(),
        desc: String::new(),
        due_date: None,
        priority: Priority::Medium,
        order,
        created_at: Timestamp::from_millis(1),
        updated_at: Timestamp::from_millis(1),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_board_sees_first_boards_changes() {
    let store = Arc::new(MemoryStore::new());
    let mut laptop = open(&store);
    let mut phone = open(&store);

    let groceries = add_list(&mut laptop, "Groceries").await;
    add_tasks(&mut laptop, &groceries, &["Milk", "Eggs"]).await;

    let id = groceries.clone();
    assert!(phone.sync_until(|m| m.task_count(&id) == 2, WAIT).await.unwrap());
    assert_eq!(titles(&phone, &groceries), ["Milk", "Eggs"]);
    assert_eq!(phone.mirror().lists()[0].name, "Groceries");
}

#[tokio::test]
async fn lists_arrive_in_creation_order() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    add_list(&mut board, "First").await;
    add_list(&mut board, "Second").await;
    add_list(&mut board, "Third").await;

    let names: Vec<&str> = board.mirror().lists().iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["First", "Second", "Third"]);
}

#[tokio::test]
async fn add_task_touches_list_updated_at() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let id = add_list(&mut board, "Work").await;
    let before = board.mirror().list(&id).unwrap().updated_at;

    add_tasks(&mut board, &id, &["Report"]).await;
    let wanted = id.clone();
    assert!(board
        .sync_until(|m| m.list(&wanted).is_some_and(|l| l.updated_at > before), WAIT)
        .await
        .unwrap());
}

#[tokio::test]
async fn duplicate_and_orphan_records_are_filtered() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let id = add_list(&mut board, "L").await;
    board.settle(Duration::from_millis(20)).await.unwrap();

    let mut newer = raw_task("x", &id, 0);
    newer.title = "x (edited)".into();
    board
        .handle_event(SyncEvent::Tasks {
            list_id: id.clone(),
            tasks: vec![
                raw_task("x", &id, 0),
                raw_task("stray", &ListId::new("elsewhere"), 1),
                raw_task("y", &id, 1),
                newer,
            ],
        })
        .unwrap();

    assert_eq!(titles(&board, &id), ["x (edited)", "y"]);
}

#[tokio::test]
async fn repeated_snapshot_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let id = add_list(&mut board, "L").await;
    add_tasks(&mut board, &id, &["a", "b"]).await;

    let tasks = board.mirror().tasks(&id).to_vec();
    for _ in 0..3 {
        board
            .handle_event(SyncEvent::Tasks {
                list_id: id.clone(),
                tasks: tasks.clone(),
            })
            .unwrap();
    }
    assert_eq!(board.mirror().tasks(&id), tasks.as_slice());
}

#[tokio::test]
async fn vanished_list_is_dropped_and_unsubscribed() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let keep = add_list(&mut board, "Keep").await;
    let gone = add_list(&mut board, "Gone").await;
    add_tasks(&mut board, &keep, &["k"]).await;
    add_tasks(&mut board, &gone, &["g"]).await;
    let subs_before = store.live_subscriptions();

    // Another client removes the list record.
    let mut batch = WriteBatch::new();
    batch.delete(path::list(&user(), &gone));
    store.commit(batch).await.unwrap();

    let gone_id = gone.clone();
    assert!(board.sync_until(|m| m.list(&gone_id).is_none(), WAIT).await.unwrap());
    assert!(board.mirror().tasks(&gone).is_empty());
    assert_eq!(titles(&board, &keep), ["k"]);

    // The aborted forwarder drops its subscription shortly after.
    let deadline = tokio::time::Instant::now() + WAIT;
    while store.live_subscriptions() >= subs_before && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(store.live_subscriptions(), subs_before - 1);

    // The surviving list still syncs.
    add_tasks(&mut board, &keep, &["k2"]).await;
    assert_eq!(titles(&board, &keep), ["k", "k2"]);
}

#[tokio::test]
async fn rejected_commit_stays_pending_until_next_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let id = add_list(&mut board, "L").await;
    add_tasks(&mut board, &id, &["a", "b", "c"]).await;
    let first = board.mirror().tasks(&id)[0].id.clone();

    store.fail_next_write("quota exceeded");
    let err = board
        .on_drag_end(&DragEvent {
            task_id: first,
            source: Location::in_list(id.clone(), 0),
            destination: Some(Location::in_list(id.clone(), 2)),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::CommitFailed(_)));
    assert_eq!(err.to_string(), "could not save changes, please try again");

    // Optimistic order is kept as-is.
    assert_eq!(titles(&board, &id), ["b", "c", "a"]);
    assert_eq!(board.mirror().sync_state(&id), Some(SyncState::Pending));

    // The next authoritative snapshot restores the stored order.
    add_tasks(&mut board, &id, &["d"]).await;
    assert_eq!(titles(&board, &id), ["a", "b", "c", "d"]);
    assert_eq!(board.mirror().sync_state(&id), Some(SyncState::Confirmed));
}

#[tokio::test]
async fn blank_task_title_is_rejected_locally() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let id = add_list(&mut board, "L").await;
    let attempts = store.write_attempts();

    let err = board.add_task(&id, TaskDraft::titled("  ")).await.unwrap_err();
    assert_eq!(err.to_string(), "task title cannot be empty");
    assert_eq!(store.write_attempts(), attempts);
}

#[tokio::test]
async fn noop_drop_reports_noop() {
    let store = Arc::new(MemoryStore::new());
    let mut board = open(&store);
    let id = add_list(&mut board, "L").await;
    add_tasks(&mut board, &id, &["a"]).await;
    let task_id = board.mirror().tasks(&id)[0].id.clone();
    let attempts = store.write_attempts();

    let here = Location::in_list(id.clone(), 0);
    let outcome = board
        .on_drag_end(&DragEvent {
            task_id,
            source: here.clone(),
            destination: Some(here),
        })
        .await
        .unwrap();
    assert_eq!(outcome, DragOutcome::NoOp);
    assert_eq!(store.write_attempts(), attempts);
}

#[tokio::test]
async fn lists_of_other_users_are_invisible() {
    let store = Arc::new(MemoryStore::new());
    let mut ann = open(&store);
    let mut bob = Board::open(Arc::clone(&store), UserId::new("bob"), BoardSettings::default()).unwrap();

    add_list(&mut ann, "Ann's").await;
    let mut direct = WriteBatch::new();
    direct.set(
        path::list(&UserId::new("bob"), &ListId::new("b1")),
        List::creation_fields("Bob's"),
        false,
    );
    store.commit(direct).await.unwrap();

    assert!(bob.sync_until(|m| m.lists().len() == 1, WAIT).await.unwrap());
    assert_eq!(bob.mirror().lists()[0].name, "Bob's");
    ann.settle(Duration::from_millis(20)).await.unwrap();
    assert_eq!(ann.mirror().lists().len(), 1);
}
