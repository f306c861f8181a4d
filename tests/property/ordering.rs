//! Property-based tests for task ordering.
//!
//! Uses proptest to verify:
//! 1. Any sequence of drags keeps every list numbered 0..n-1.
//! 2. Cross-list drags never lose or duplicate a task.
//! 3. A same-list drag is a no-op exactly when the task lands where it was.
//! 4. Priority drops leave order and list untouched.
//! 5. `dedup_by_id` leaves unique IDs in first-seen order.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;

use proptest::prelude::*;
use taskboard::store::memory::MemoryStore;
use taskboard::tasks::{Container, Location, Mirror, MutationDispatcher, ReorderPlan, dedup_by_id, plan};
use taskboard_proto::document::Timestamp;
use taskboard_proto::list::{List, ListId};
use taskboard_proto::task::{Priority, Task, TaskId};

// --- Fixtures ---

fn list_ids() -> [ListId; 2] {
    [ListId::new("left"), ListId::new("right")]
}

fn task(id: &str, list_id: &ListId, order: u32) -> Task {
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

/// Mirror with two lists holding `left` and `right` tasks, numbered in order.
fn mirror_with(left: usize, right: usize) -> Mirror {
    let ids = list_ids();
    let mut mirror = Mirror::new();
    mirror.apply_lists_snapshot(
        ids.iter()
            .map(|id| List {
                id: id.clone(),
                name: id.to_string(),
                created_at: Timestamp::from_millis(1),
                updated_at: Timestamp::from_millis(1),
            })
            .collect(),
    );
    for (list_id, count) in ids.iter().zip([left, right]) {
        let tasks = (0..count)
            .map(|n| task(&format!("{list_id}-{n}"), list_id, u32::try_from(n).unwrap()))
            .collect();
        mirror.apply_tasks_snapshot(list_id, tasks);
    }
    mirror
}

fn apply(mirror: &mut Mirror, plan: &ReorderPlan) {
    MutationDispatcher::<MemoryStore>::apply_optimistic(mirror, plan);
}

fn all_ids(mirror: &Mirror) -> Vec<TaskId> {
    list_ids()
        .iter()
        .flat_map(|l| mirror.tasks(l).iter().map(|t| t.id.clone()))
        .collect()
}

/// Every list is numbered 0..n-1 and every task names its own list.
fn assert_well_numbered(mirror: &Mirror) -> Result<(), TestCaseError> {
    for list_id in list_ids() {
        for (index, t) in mirror.tasks(&list_id).iter().enumerate() {
            prop_assert_eq!(t.order as usize, index);
            prop_assert_eq!(&t.list_id, &list_id);
        }
    }
    Ok(())
}

/// A drag described by indices into the current state.
#[derive(Debug, Clone)]
struct Drag {
    from_right: bool,
    from: usize,
    to_right: bool,
    to: usize,
}

fn arb_drag() -> impl Strategy<Value = Drag> {
    (any::<bool>(), 0..16usize, any::<bool>(), 0..20usize).prop_map(
        |(from_right, from, to_right, to)| Drag {
            from_right,
            from,
            to_right,
            to,
        },
    )
}

// --- Properties ---

proptest! {
    #[test]
    fn drags_keep_lists_well_numbered(
        left in 0..10usize,
        right in 0..10usize,
        drags in prop::collection::vec(arb_drag(), 0..30),
    ) {
        let ids = list_ids();
        let mut mirror = mirror_with(left, right);
        let before: HashSet<TaskId> = all_ids(&mirror).into_iter().collect();

        for drag in drags {
            let source_list = &ids[usize::from(drag.from_right)];
            let tasks = mirror.tasks(source_list);
            if tasks.is_empty() {
                continue;
            }
            let from = drag.from % tasks.len();
            let task_id = tasks[from].id.clone();
            let source = Location::in_list(source_list.clone(), from);
            let destination = Location::in_list(ids[usize::from(drag.to_right)].clone(), drag.to);

            if let Some(plan) = plan(&mirror, &task_id, &source, &destination) {
                apply(&mut mirror, &plan);
            }
            assert_well_numbered(&mirror)?;
        }

        let after = all_ids(&mirror);
        let unique: HashSet<TaskId> = after.iter().cloned().collect();
        prop_assert_eq!(after.len(), left + right);
        prop_assert_eq!(unique, before);
    }

    #[test]
    fn same_list_noop_iff_position_unchanged(
        count in 1..12usize,
        from in 0..12usize,
        to in 0..16usize,
    ) {
        let [list_id, _] = list_ids();
        let mirror = mirror_with(count, 0);
        let from = from % count;
        let task_id = mirror.tasks(&list_id)[from].id.clone();

        let result = plan(
            &mirror,
            &task_id,
            &Location::in_list(list_id.clone(), from),
            &Location::in_list(list_id.clone(), to),
        );
        let lands_at = to.min(count - 1);
        prop_assert_eq!(result.is_none(), lands_at == from);

        if let Some(ReorderPlan::Reorder { sequence, changed, .. }) = result {
            prop_assert_eq!(&sequence[lands_at].id, &task_id);
            // Only the span between the two positions is rewritten.
            prop_assert_eq!(changed.len(), from.abs_diff(lands_at) + 1);
        }
    }

    #[test]
    fn transfer_sizes_and_placement(
        left in 1..10usize,
        right in 0..10usize,
        from in 0..10usize,
        to in 0..14usize,
    ) {
        let [source_list, dest_list] = list_ids();
        let mut mirror = mirror_with(left, right);
        let from = from % left;
        let task_id = mirror.tasks(&source_list)[from].id.clone();

        let plan = plan(
            &mirror,
            &task_id,
            &Location::in_list(source_list.clone(), from),
            &Location::in_list(dest_list.clone(), to),
        )
        .unwrap();
        let ReorderPlan::Transfer { moved, .. } = &plan else {
            return Err(TestCaseError::fail("expected a transfer"));
        };
        let placed = to.min(right);
        prop_assert_eq!(moved.order as usize, placed);
        prop_assert_eq!(&moved.list_id, &dest_list);

        apply(&mut mirror, &plan);
        prop_assert_eq!(mirror.task_count(&source_list), left - 1);
        prop_assert_eq!(mirror.task_count(&dest_list), right + 1);
        prop_assert_eq!(&mirror.tasks(&dest_list)[placed].id, &task_id);
        prop_assert!(mirror.find_task(&source_list, &task_id).is_none());
        assert_well_numbered(&mirror)?;
    }

    #[test]
    fn priority_drop_keeps_position(
        count in 1..10usize,
        from in 0..10usize,
        priority in prop::sample::select(Priority::ALL.to_vec()),
    ) {
        let [list_id, _] = list_ids();
        let mut mirror = mirror_with(count, 0);
        let from = from % count;
        let before = mirror.tasks(&list_id)[from].clone();

        let zone = Location {
            container: Container::PriorityZone { list_id: list_id.clone(), priority },
            index: 0,
        };
        let plan = plan(&mirror, &before.id, &Location::in_list(list_id.clone(), from), &zone)
            .unwrap();
        apply(&mut mirror, &plan);

        let after = &mirror.tasks(&list_id)[from];
        prop_assert_eq!(&after.id, &before.id);
        prop_assert_eq!(after.priority, priority);
        prop_assert_eq!(after.order, before.order);
        prop_assert_eq!(&after.list_id, &before.list_id);
    }

    #[test]
    fn dedup_leaves_unique_ids_in_first_seen_order(
        keys in prop::collection::vec(0..6u8, 0..40),
    ) {
        let [list_id, _] = list_ids();
        let tasks: Vec<Task> = keys
            .iter()
            .enumerate()
            .map(|(n, k)| task(&format!("t{k}"), &list_id, u32::try_from(n).unwrap()))
            .collect();

        let mut first_seen = Vec::new();
        for k in &keys {
            if !first_seen.contains(k) {
                first_seen.push(*k);
            }
        }

        let deduped = dedup_by_id(tasks);
        let ids: Vec<String> = deduped.iter().map(|t| t.id.to_string()).collect();
        let expected: Vec<String> = first_seen.iter().map(|k| format!("t{k}")).collect();
        prop_assert_eq!(ids, expected);

        // The surviving copy is the last one delivered.
        for t in &deduped {
            let last = keys
                .iter()
                .rposition(|k| format!("t{k}") == t.id.as_str())
                .unwrap();
            prop_assert_eq!(t.order as usize, last);
        }
    }
}
