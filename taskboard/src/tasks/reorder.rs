//! Drag-and-drop reorder planning.
//!
//! [`plan`] turns a finished drag into a [`ReorderPlan`]: the complete new
//! state of every sequence the drop touches, plus the tasks whose stored
//! record must change. Planning reads the mirror and never mutates it.
//!
//! Drop targets are identified by container strings:
//!
//! | Container        | Text form                         |
//! |------------------|-----------------------------------|
//! | list column      | `list-{listId}`                   |
//! | priority zone    | `priority-{listId}-{High\|Medium\|Low}` |

use std::fmt;
use std::str::FromStr;

use taskboard_proto::list::ListId;
use taskboard_proto::task::{Priority, Task, TaskId};

use super::mirror::Mirror;

/// Prefix of list container IDs.
const LIST_PREFIX: &str = "list-";
/// Prefix of priority zone container IDs.
const PRIORITY_PREFIX: &str = "priority-";

/// A drop target or drag origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    /// The ordered task column of a list.
    List(ListId),
    /// A priority bucket shown for a list.
    PriorityZone {
        /// List the zone is displayed under.
        list_id: ListId,
        /// Priority assigned by dropping here.
        priority: Priority,
    },
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(id) => write!(f, "{LIST_PREFIX}{id}"),
            Self::PriorityZone { list_id, priority } => {
                write!(f, "{PRIORITY_PREFIX}{list_id}-{}", priority.label())
            }
        }
    }
}

/// Error for a container ID that matches neither form.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid container `{0}` (expected list-<id> or priority-<id>-<High|Medium|Low>)")]
pub struct ParseContainerError(pub String);

impl FromStr for Container {
    type Err = ParseContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseContainerError(s.to_string());
        if let Some(id) = s.strip_prefix(LIST_PREFIX) {
            if id.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::List(ListId::new(id)));
        }
        let rest = s.strip_prefix(PRIORITY_PREFIX).ok_or_else(invalid)?;
        // List IDs may contain '-', the label never does.
        let (id, label) = rest.rsplit_once('-').ok_or_else(invalid)?;
        if id.is_empty() {
            return Err(invalid());
        }
        let priority = label.parse().map_err(|_| invalid())?;
        Ok(Self::PriorityZone {
            list_id: ListId::new(id),
            priority,
        })
    }
}

/// A position inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Container holding the position.
    pub container: Container,
    /// Index within the container's sequence.
    pub index: usize,
}

impl Location {
    /// Position `index` of a list column.
    #[must_use]
    pub const fn in_list(list_id: ListId, index: usize) -> Self {
        Self {
            container: Container::List(list_id),
            index,
        }
    }
}

/// The result of a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEvent {
    /// Task being dragged.
    pub task_id: TaskId,
    /// Where the drag started.
    pub source: Location,
    /// Where it was dropped; `None` for an aborted drag.
    pub destination: Option<Location>,
}

/// New complete task sequence of one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSequence {
    /// List the sequence belongs to.
    pub list_id: ListId,
    /// Tasks in display order with `order == index`.
    pub tasks: Vec<Task>,
}

/// Replacement state computed for a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderPlan {
    /// Only the task's priority changes.
    Reprioritize {
        /// The task with its new priority.
        task: Task,
    },
    /// The task moves within its own list.
    Reorder {
        /// List being reordered.
        list_id: ListId,
        /// Full new sequence.
        sequence: Vec<Task>,
        /// Tasks whose stored order differs from the new one.
        changed: Vec<Task>,
    },
    /// The task moves to another list.
    Transfer {
        /// The moved task as it will exist in the destination.
        moved: Task,
        /// Remaining sequence of the list it left.
        source: ListSequence,
        /// New sequence of the list it joined, including the moved task.
        destination: ListSequence,
        /// Other tasks, in either list, whose stored order changes.
        changed: Vec<Task>,
    },
}

impl ReorderPlan {
    /// Tasks whose records must be written.
    #[must_use]
    pub fn changed_tasks(&self) -> Vec<&Task> {
        match self {
            Self::Reprioritize { task } => vec![task],
            Self::Reorder { changed, .. } => changed.iter().collect(),
            Self::Transfer { moved, changed, .. } => {
                std::iter::once(moved).chain(changed.iter()).collect()
            }
        }
    }

    /// Lists whose `updatedAt` must be touched.
    #[must_use]
    pub fn affected_lists(&self) -> Vec<&ListId> {
        match self {
            Self::Reprioritize { task } => vec![&task.list_id],
            Self::Reorder { list_id, .. } => vec![list_id],
            Self::Transfer {
                source,
                destination,
                ..
            } => vec![&source.list_id, &destination.list_id],
        }
    }
}

/// Computes the plan for dropping `task_id` from `source` onto `destination`.
///
/// Returns `None` when the drop changes nothing: the source is not a list,
/// the task is no longer in the source list, the destination list is
/// unknown or has not delivered its first tasks snapshot, or a same-list
/// move leaves every order as it was. The source
/// index is advisory; the task is located by ID. A destination index past
/// the end appends.
#[must_use]
pub fn plan(
    mirror: &Mirror,
    task_id: &TaskId,
    source: &Location,
    destination: &Location,
) -> Option<ReorderPlan> {
    let Container::List(source_list) = &source.container else {
        tracing::debug!(source = %source.container, "drag source is not a list");
        return None;
    };
    let Some((position, task)) = mirror.find_task(source_list, task_id) else {
        tracing::debug!(list = %source_list, task = %task_id, "stale drag ignored");
        return None;
    };
    if position != source.index {
        tracing::trace!(
            task = %task_id,
            reported = source.index,
            actual = position,
            "source index out of date"
        );
    }

    match &destination.container {
        Container::PriorityZone { priority, .. } => {
            let mut task = task.clone();
            task.priority = *priority;
            Some(ReorderPlan::Reprioritize { task })
        }
        Container::List(dest_list) if dest_list == source_list => reorder_within(
            source_list,
            mirror.tasks(source_list),
            position,
            destination.index,
        ),
        Container::List(dest_list) => {
            if mirror.list(dest_list).is_none() {
                tracing::debug!(list = %dest_list, "drop onto unknown list ignored");
                return None;
            }
            // Without a first snapshot the stored orders there are unknown.
            if mirror.sync_state(dest_list).is_none() {
                tracing::debug!(list = %dest_list, "drop onto unsynced list ignored");
                return None;
            }
            Some(transfer(
                source_list,
                mirror.tasks(source_list),
                position,
                dest_list,
                mirror.tasks(dest_list),
                destination.index,
            ))
        }
    }
}

fn reorder_within(list_id: &ListId, tasks: &[Task], from: usize, to: usize) -> Option<ReorderPlan> {
    let mut sequence = tasks.to_vec();
    let moved = sequence.remove(from);
    let to = to.min(sequence.len());
    sequence.insert(to, moved);

    let changed = renumber(&mut sequence);
    if changed.is_empty() {
        return None;
    }
    Some(ReorderPlan::Reorder {
        list_id: list_id.clone(),
        sequence,
        changed,
    })
}

fn transfer(
    source_list: &ListId,
    source_tasks: &[Task],
    from: usize,
    dest_list: &ListId,
    dest_tasks: &[Task],
    to: usize,
) -> ReorderPlan {
    let mut remaining = source_tasks.to_vec();
    let mut moved = remaining.remove(from);
    moved.list_id = dest_list.clone();

    let mut joined: Vec<Task> = dest_tasks
        .iter()
        .filter(|t| t.id != moved.id)
        .cloned()
        .collect();
    let to = to.min(joined.len());
    joined.insert(to, moved);

    let mut changed = renumber(&mut remaining);
    let moved = {
        let dest_changed = renumber(&mut joined);
        let moved = joined[to].clone();
        changed.extend(dest_changed.into_iter().filter(|t| t.id != moved.id));
        moved
    };

    ReorderPlan::Transfer {
        moved,
        source: ListSequence {
            list_id: source_list.clone(),
            tasks: remaining,
        },
        destination: ListSequence {
            list_id: dest_list.clone(),
            tasks: joined,
        },
        changed,
    }
}

/// Sets `order = index` across a sequence, returning the tasks that changed.
fn renumber(sequence: &mut [Task]) -> Vec<Task> {
    let mut changed = Vec::new();
    for (index, task) in sequence.iter_mut().enumerate() {
        let order = u32::try_from(index).unwrap_or(u32::MAX);
        if task.order != order {
            task.order = order;
            changed.push(task.clone());
        }
    }
    changed
}
