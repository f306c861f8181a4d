//! End-to-end drag-and-drop scenarios against the in-memory store.
//!
//! Each test drives a [`Board`] through `on_drag_end` and then checks both
//! the mirror and the records the store ends up holding.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use taskboard::store::memory::MemoryStore;
use taskboard::tasks::{Board, BoardSettings, Container, DragEvent, DragOutcome, Location};
use taskboard_proto::document::Document;
use taskboard_proto::list::ListId;
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

/// Opens a board with one list per `(name, titles)` entry, fully synced.
/// Titles are whitespace-separated.
async fn board_with(
    store: &Arc<MemoryStore>,
    lists: &[(&str, &str)],
) -> (Board<MemoryStore>, Vec<ListId>) {
    let mut board = Board::open(Arc::clone(store), user(), BoardSettings::default()).unwrap();
    let mut ids = Vec::new();
    for (name, titles) in lists {
        let id = board.add_list(name).await.unwrap();
        let wanted = id.clone();
        assert!(board.sync_until(|m| m.list(&wanted).is_some(), WAIT).await.unwrap());
        for (n, title) in titles.split_whitespace().enumerate() {
            board.add_task(&id, TaskDraft::titled(title)).await.unwrap();
            let wanted = id.clone();
            assert!(board
                .sync_until(|m| m.task_count(&wanted) == n + 1, WAIT)
                .await
                .unwrap());
        }
        ids.push(id);
    }
    board.settle(Duration::from_millis(20)).await.unwrap();
    (board, ids)
}

fn task_named(board: &Board<MemoryStore>, list_id: &ListId, title: &str) -> Task {
    board
        .mirror()
        .tasks(list_id)
        .iter()
        .find(|t| t.title == title)
        .cloned()
        .unwrap()
}

fn order_of(board: &Board<MemoryStore>, list_id: &ListId) -> Vec<(String, u32)> {
    board
        .mirror()
        .tasks(list_id)
        .iter()
        .map(|t| (t.title.clone(), t.order))
        .collect()
}

/// Reads a task record straight from the store.
fn stored_task(store: &MemoryStore, list_id: &ListId, task_id: &TaskId) -> Option<Task> {
    let doc_path = path::task(&user(), list_id, task_id);
    let fields = store.document(&doc_path)?;
    Some(Task::from_document(&Document::new(doc_path, fields)).unwrap())
}

fn drag(task: &Task, from: usize, to: Location) -> DragEvent {
    DragEvent {
        task_id: task.id.clone(),
        source: Location::in_list(task.list_id.clone(), from),
        destination: Some(to),
    }
}

fn pairs(items: &[(&str, u32)]) -> Vec<(String, u32)> {
    items.iter().map(|(t, o)| ((*t).to_string(), *o)).collect()
}

// ---------------------------------------------------------------------------
// Same-list moves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_first_grocery_to_end() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("Groceries", "A B C")]).await;
    let groceries = &ids[0];
    let a = task_named(&board, groceries, "A");

    let outcome = board
        .on_drag_end(&drag(&a, 0, Location::in_list(groceries.clone(), 2)))
        .await
        .unwrap();
    // Three order updates plus the list touch.
    assert_eq!(outcome, DragOutcome::Applied { writes: 4 });

    let expected = pairs(&[("B", 0), ("C", 1), ("A", 2)]);
    assert_eq!(order_of(&board, groceries), expected);

    for (title, order) in [("A", 2), ("B", 0), ("C", 1)] {
        let task = task_named(&board, groceries, title);
        assert_eq!(stored_task(&store, groceries, &task.id).unwrap().order, order);
    }

    board.settle(Duration::from_millis(30)).await.unwrap();
    assert_eq!(order_of(&board, groceries), expected);
}

#[tokio::test]
async fn move_up_only_writes_shifted_tasks() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("L", "a b c d")]).await;
    let list = &ids[0];
    let c = task_named(&board, list, "c");

    let outcome = board
        .on_drag_end(&drag(&c, 2, Location::in_list(list.clone(), 1)))
        .await
        .unwrap();
    // b and c swap; a and d keep their orders.
    assert_eq!(outcome, DragOutcome::Applied { writes: 3 });
    assert_eq!(
        order_of(&board, list),
        pairs(&[("a", 0), ("c", 1), ("b", 2), ("d", 3)])
    );
}

#[tokio::test]
async fn index_past_end_appends() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("L", "a b")]).await;
    let list = &ids[0];
    let a = task_named(&board, list, "a");

    board
        .on_drag_end(&drag(&a, 0, Location::in_list(list.clone(), 99)))
        .await
        .unwrap();
    assert_eq!(order_of(&board, list), pairs(&[("b", 0), ("a", 1)]));
}

// ---------------------------------------------------------------------------
// Priority zones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn drop_on_low_zone_only_changes_priority() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("Work", "X Y")]).await;
    let work = &ids[0];
    let x = task_named(&board, work, "X");
    assert_eq!(x.priority, Priority::Medium);

    let zone = Location {
        container: Container::PriorityZone {
            list_id: work.clone(),
            priority: Priority::Low,
        },
        index: 0,
    };
    let outcome = board.on_drag_end(&drag(&x, 0, zone)).await.unwrap();
    assert_eq!(outcome, DragOutcome::Applied { writes: 2 });

    let stored = stored_task(&store, work, &x.id).unwrap();
    assert_eq!(stored.priority, Priority::Low);
    assert_eq!(stored.priority.rank(), 3);
    assert_eq!(stored.order, x.order);
    assert_eq!(stored.list_id, x.list_id);

    let mirrored = task_named(&board, work, "X");
    assert_eq!(mirrored.priority, Priority::Low);
    assert_eq!(mirrored.order, 0);
}

#[tokio::test]
async fn zone_parsed_from_container_id() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("Work", "X")]).await;
    let work = &ids[0];
    let x = task_named(&board, work, "X");

    let container: Container = format!("priority-{work}-High").parse().unwrap();
    board
        .on_drag_end(&drag(&x, 0, Location { container, index: 0 }))
        .await
        .unwrap();
    assert_eq!(stored_task(&store, work, &x.id).unwrap().priority, Priority::High);
}

// ---------------------------------------------------------------------------
// Cross-list moves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transfer_conserves_tasks() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) =
        board_with(&store, &[("Home", "h1 h2 h3"), ("Shop", "s1 s2")]).await;
    let (home, shop) = (&ids[0], &ids[1]);
    let h2 = task_named(&board, home, "h2");

    board
        .on_drag_end(&drag(&h2, 1, Location::in_list(shop.clone(), 1)))
        .await
        .unwrap();

    assert_eq!(order_of(&board, home), pairs(&[("h1", 0), ("h3", 1)]));
    assert_eq!(
        order_of(&board, shop),
        pairs(&[("s1", 0), ("h2", 1), ("s2", 2)])
    );

    // The record moved: gone from the old path, present under the new list.
    assert!(stored_task(&store, home, &h2.id).is_none());
    let moved = stored_task(&store, shop, &h2.id).unwrap();
    assert_eq!(moved.list_id, *shop);
    assert_eq!(moved.order, 1);
    assert_eq!(moved.title, "h2");
    assert_eq!(moved.priority, h2.priority);

    let s2 = task_named(&board, shop, "s2");
    assert_eq!(stored_task(&store, shop, &s2.id).unwrap().order, 2);
    let h3 = task_named(&board, home, "h3");
    assert_eq!(stored_task(&store, home, &h3.id).unwrap().order, 1);

    // Snapshots confirm the same layout.
    board.settle(Duration::from_millis(30)).await.unwrap();
    assert_eq!(board.mirror().task_count(home), 2);
    assert_eq!(board.mirror().task_count(shop), 3);
}

#[tokio::test]
async fn transfer_into_empty_list() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("From", "t"), ("To", "")]).await;
    let (from, to) = (&ids[0], &ids[1]);
    let t = task_named(&board, from, "t");

    board
        .on_drag_end(&drag(&t, 0, Location::in_list(to.clone(), 5)))
        .await
        .unwrap();
    assert!(board.mirror().tasks(from).is_empty());
    assert_eq!(order_of(&board, to), pairs(&[("t", 0)]));
    assert_eq!(stored_task(&store, to, &t.id).unwrap().order, 0);
}

// ---------------------------------------------------------------------------
// No-ops
// ---------------------------------------------------------------------------

#[tokio::test]
async fn noop_drops_write_nothing() {
    let store = Arc::new(MemoryStore::new());
    let (mut board, ids) = board_with(&store, &[("L", "a b")]).await;
    let list = &ids[0];
    let a = task_named(&board, list, "a");
    let before = order_of(&board, list);
    let attempts = store.write_attempts();

    let cases = [
        // Aborted drag.
        DragEvent {
            task_id: a.id.clone(),
            source: Location::in_list(list.clone(), 0),
            destination: None,
        },
        // Dropped where it started.
        drag(&a, 0, Location::in_list(list.clone(), 0)),
        // Stale task id.
        DragEvent {
            task_id: TaskId::new("gone"),
            source: Location::in_list(list.clone(), 0),
            destination: Some(Location::in_list(list.clone(), 1)),
        },
        // Unknown destination list.
        drag(&a, 0, Location::in_list(ListId::new("nowhere"), 0)),
    ];
    for event in &cases {
        assert_eq!(board.on_drag_end(event).await.unwrap(), DragOutcome::NoOp);
    }

    assert_eq!(store.write_attempts(), attempts);
    assert_eq!(order_of(&board, list), before);
}
