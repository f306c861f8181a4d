//! Mutation dispatch: optimistic local patch plus one atomic batch.

use std::sync::Arc;

use taskboard_proto::batch::WriteBatch;
use taskboard_proto::list::{List, ListId};
use taskboard_proto::path::{self, DocPath};
use taskboard_proto::task::{Task, TaskDraft, TaskId};
use taskboard_proto::user::UserId;

use super::BoardError;
use super::mirror::Mirror;
use super::reorder::ReorderPlan;
use crate::store::DocumentStore;

/// Turns plans and creations into store writes for one user.
pub struct MutationDispatcher<S> {
    store: Arc<S>,
    user: UserId,
}

impl<S: DocumentStore> MutationDispatcher<S> {
    /// Creates a dispatcher writing under `users/{user}`.
    #[must_use]
    pub const fn new(store: Arc<S>, user: UserId) -> Self {
        Self { store, user }
    }

    /// Builds the batch realizing `plan`.
    ///
    /// One write per changed task, a delete of the old record for a
    /// cross-list move, then an `updatedAt` touch per affected list.
    #[must_use]
    pub fn build_batch(&self, plan: &ReorderPlan) -> WriteBatch {
        let mut batch = WriteBatch::new();
        match plan {
            ReorderPlan::Reprioritize { task } => {
                batch.update(self.task_path(task), Task::priority_fields(task.priority));
            }
            ReorderPlan::Reorder { changed, .. } => {
                for task in changed {
                    batch.update(self.task_path(task), Task::order_fields(task.order));
                }
            }
            ReorderPlan::Transfer {
                moved,
                source,
                changed,
                ..
            } => {
                batch
                    .delete(path::task(&self.user, &source.list_id, &moved.id))
                    .set(self.task_path(moved), moved.to_fields(), true);
                for task in changed {
                    batch.update(self.task_path(task), Task::order_fields(task.order));
                }
            }
        }
        for list_id in plan.affected_lists() {
            batch.update(path::list(&self.user, list_id), List::touch_fields());
        }
        batch
    }

    /// Applies `plan` to the mirror ahead of the store.
    pub fn apply_optimistic(mirror: &mut Mirror, plan: &ReorderPlan) {
        match plan {
            ReorderPlan::Reprioritize { task } => {
                mirror.apply_task_update(task.clone());
            }
            ReorderPlan::Reorder {
                list_id, sequence, ..
            } => mirror.apply_sequence(list_id, sequence.clone()),
            ReorderPlan::Transfer {
                source,
                destination,
                ..
            } => {
                mirror.apply_sequence(&source.list_id, source.tasks.clone());
                mirror.apply_sequence(&destination.list_id, destination.tasks.clone());
            }
        }
    }

    /// Patches the mirror, then commits the plan's batch.
    ///
    /// Returns the number of writes committed. On failure the patch stays in
    /// place until the next snapshot for the list replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CommitFailed`] if the store rejects the batch.
    pub async fn dispatch(&self, mirror: &mut Mirror, plan: &ReorderPlan) -> Result<usize, BoardError> {
        Self::apply_optimistic(mirror, plan);
        let batch = self.build_batch(plan);
        let writes = batch.len();
        match self.store.commit(batch).await {
            Ok(()) => {
                tracing::info!(writes, lists = plan.affected_lists().len(), "reorder committed");
                Ok(writes)
            }
            Err(e) => {
                tracing::warn!(error = %e, writes, "reorder commit failed");
                Err(BoardError::CommitFailed(e))
            }
        }
    }

    /// Creates a list named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CommitFailed`] if the store rejects the record.
    pub async fn create_list(&self, name: &str) -> Result<ListId, BoardError> {
        let path = self
            .store
            .create_record(&path::lists(&self.user), List::creation_fields(name))
            .await
            .map_err(BoardError::CommitFailed)?;
        tracing::info!(list = %path.id(), "list created");
        Ok(ListId::new(path.id()))
    }

    /// Creates a task at position `order` of `list_id` and touches the list.
    ///
    /// A failed touch is logged and does not fail the creation.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CommitFailed`] if the store rejects the record.
    pub async fn create_task(
        &self,
        list_id: &ListId,
        draft: &TaskDraft,
        order: u32,
    ) -> Result<TaskId, BoardError> {
        let path = self
            .store
            .create_record(
                &path::tasks(&self.user, list_id),
                draft.creation_fields(list_id, order),
            )
            .await
            .map_err(BoardError::CommitFailed)?;
        let task_id = TaskId::new(path.id());
        tracing::info!(list = %list_id, task = %task_id, order, "task created");

        let mut touch = WriteBatch::new();
        touch.update(path::list(&self.user, list_id), List::touch_fields());
        if let Err(e) = self.store.commit(touch).await {
            tracing::warn!(list = %list_id, error = %e, "could not touch list after task creation");
        }
        Ok(task_id)
    }

    fn task_path(&self, task: &Task) -> DocPath {
        path::task(&self.user, &task.list_id, &task.id)
    }
}
