//! Local mirror of a user's lists and tasks.
//!
//! The mirror is a projection of the most recent snapshots: a lists snapshot
//! replaces the lists wholesale, a tasks snapshot replaces one list's entry.
//! Between a local mutation and the snapshot that confirms it, an entry can
//! hold an optimistic sequence instead; its [`SyncState`] says which.

use std::collections::HashMap;
use std::hash::Hash;

use taskboard_proto::list::{List, ListId};
use taskboard_proto::task::{Task, TaskId};

/// Where a list's task sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Exactly the last snapshot delivered for the list.
    Confirmed,
    /// A local patch that no snapshot has replaced yet.
    Pending,
}

#[derive(Debug, Clone)]
struct ListEntry {
    tasks: Vec<Task>,
    state: SyncState,
}

/// In-memory view of lists and per-list task sequences.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    /// Lists in creation order.
    lists: Vec<List>,
    /// List ID -> ordered tasks of that list.
    tasks_by_list: HashMap<ListId, ListEntry>,
}

impl Mirror {
    /// Creates an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the lists with a new snapshot.
    ///
    /// Task entries of lists missing from the snapshot are dropped. Returns
    /// the IDs of those lists.
    pub fn apply_lists_snapshot(&mut self, lists: Vec<List>) -> Vec<ListId> {
        self.lists = dedup_keep_last(lists, |l| &l.id);

        let mut removed: Vec<ListId> = self
            .tasks_by_list
            .keys()
            .filter(|id| !self.lists.iter().any(|l| &l.id == *id))
            .cloned()
            .collect();
        removed.sort();
        for id in &removed {
            self.tasks_by_list.remove(id);
            tracing::debug!(list = %id, "list vanished, dropping its tasks");
        }
        removed
    }

    /// Replaces one list's tasks with a snapshot.
    ///
    /// Duplicate IDs collapse to one entry and records whose `list_id` names
    /// another list are dropped. The result is stably sorted by `order`, so
    /// position always follows the stored rank. Snapshots for unknown lists
    /// are ignored and `false` is returned.
    pub fn apply_tasks_snapshot(&mut self, list_id: &ListId, tasks: Vec<Task>) -> bool {
        if self.list(list_id).is_none() {
            tracing::debug!(list = %list_id, "ignoring tasks for unknown list");
            return false;
        }
        let before = tasks.len();
        let tasks: Vec<Task> = tasks.into_iter().filter(|t| &t.list_id == list_id).collect();
        if tasks.len() != before {
            tracing::debug!(list = %list_id, dropped = before - tasks.len(), "dropped orphan tasks");
        }
        let mut tasks = dedup_by_id(tasks);
        tasks.sort_by_key(|t| t.order);
        self.tasks_by_list.insert(
            list_id.clone(),
            ListEntry {
                tasks,
                state: SyncState::Confirmed,
            },
        );
        true
    }

    /// Installs an optimistic sequence for a list.
    ///
    /// The sequence stays until the next snapshot for the list replaces it.
    pub fn apply_sequence(&mut self, list_id: &ListId, tasks: Vec<Task>) {
        self.tasks_by_list.insert(
            list_id.clone(),
            ListEntry {
                tasks: dedup_by_id(tasks),
                state: SyncState::Pending,
            },
        );
    }

    /// Replaces one task in place, keeping its position.
    ///
    /// Returns `false` if the task is not in its list's sequence.
    pub fn apply_task_update(&mut self, task: Task) -> bool {
        let Some(entry) = self.tasks_by_list.get_mut(&task.list_id) else {
            return false;
        };
        let Some(slot) = entry.tasks.iter_mut().find(|t| t.id == task.id) else {
            return false;
        };
        *slot = task;
        entry.state = SyncState::Pending;
        true
    }

    /// Lists in creation order.
    #[must_use]
    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    /// Looks up a list by ID.
    #[must_use]
    pub fn list(&self, list_id: &ListId) -> Option<&List> {
        self.lists.iter().find(|l| &l.id == list_id)
    }

    /// Tasks of a list in display order. Empty if nothing arrived yet.
    #[must_use]
    pub fn tasks(&self, list_id: &ListId) -> &[Task] {
        self.tasks_by_list
            .get(list_id)
            .map_or(&[], |entry| entry.tasks.as_slice())
    }

    /// Number of tasks currently mirrored for a list.
    #[must_use]
    pub fn task_count(&self, list_id: &ListId) -> usize {
        self.tasks(list_id).len()
    }

    /// Finds a task in a list, returning its position.
    #[must_use]
    pub fn find_task(&self, list_id: &ListId, task_id: &TaskId) -> Option<(usize, &Task)> {
        self.tasks(list_id)
            .iter()
            .enumerate()
            .find(|(_, t)| &t.id == task_id)
    }

    /// Sync state of a list's tasks, `None` before the first snapshot.
    #[must_use]
    pub fn sync_state(&self, list_id: &ListId) -> Option<SyncState> {
        self.tasks_by_list.get(list_id).map(|entry| entry.state)
    }

    /// Whether any list holds an unconfirmed local patch.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.tasks_by_list
            .values()
            .any(|entry| entry.state == SyncState::Pending)
    }
}

/// Collapses duplicate task IDs.
///
/// Each ID keeps the position of its first occurrence and the value of its
/// last one.
#[must_use]
pub fn dedup_by_id(tasks: Vec<Task>) -> Vec<Task> {
    dedup_keep_last(tasks, |t| &t.id)
}

fn dedup_keep_last<T, K>(items: Vec<T>, key: impl Fn(&T) -> &K) -> Vec<T>
where
    K: Eq + Hash + Clone,
{
    let mut slots: HashMap<K, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let k = key(&item).clone();
        if let Some(&i) = slots.get(&k) {
            out[i] = item;
        } else {
            slots.insert(k, out.len());
            out.push(item);
        }
    }
    out
}
