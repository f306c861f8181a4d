//! The board: single writer of a user's mirror.
//!
//! Snapshot events and user actions are handled one at a time through
//! `&mut self`, so the mirror never sees two overlapping updates even on a
//! multi-threaded runtime.

use std::sync::Arc;
use std::time::Duration;

use taskboard_proto::list::{self, List, ListId};
use taskboard_proto::task::{MAX_TASK_TITLE_LENGTH, Priority, TaskDraft, TaskId};
use taskboard_proto::user::UserId;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::BoardError;
use super::dispatch::MutationDispatcher;
use super::mirror::Mirror;
use super::reorder::{self, DragEvent};
use crate::store::DocumentStore;
use crate::sync::{CollectionProxy, SyncEvent};

/// How long `add_task` waits for a list's first tasks snapshot.
pub const FIRST_SNAPSHOT_WAIT: Duration = Duration::from_secs(2);

/// Tunables applied to user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSettings {
    /// Maximum characters in a task title or list name.
    pub max_title_len: usize,
    /// Priority given to new tasks unless one is chosen.
    pub default_priority: Priority,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            max_title_len: MAX_TASK_TITLE_LENGTH,
            default_priority: Priority::Medium,
        }
    }
}

/// What a finished drag did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Nothing changed and nothing was written.
    NoOp,
    /// The mirror was patched and a batch committed.
    Applied {
        /// Writes in the committed batch.
        writes: usize,
    },
}

/// A signed-in user's lists and tasks, kept in sync with the store.
pub struct Board<S> {
    user: UserId,
    settings: BoardSettings,
    mirror: Mirror,
    proxy: CollectionProxy<S>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    dispatcher: MutationDispatcher<S>,
}

impl<S: DocumentStore> Board<S> {
    /// Opens the board for `user` and starts syncing.
    ///
    /// The mirror starts empty; it fills as events are processed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Subscribe`] if the lists query cannot be opened.
    pub fn open(store: Arc<S>, user: UserId, settings: BoardSettings) -> Result<Self, BoardError> {
        let (proxy, events) =
            CollectionProxy::start(Arc::clone(&store), user.clone()).map_err(BoardError::Subscribe)?;
        tracing::info!(user = %user, "board opened");
        Ok(Self {
            dispatcher: MutationDispatcher::new(store, user.clone()),
            user,
            settings,
            mirror: Mirror::new(),
            proxy,
            events,
        })
    }

    /// Owner of the board.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }

    /// Current local view.
    #[must_use]
    pub const fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Applies one sync event to the mirror.
    ///
    /// A lists snapshot also re-matches the per-list task subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Subscribe`] if a new task query cannot be opened.
    pub fn handle_event(&mut self, event: SyncEvent) -> Result<(), BoardError> {
        match event {
            SyncEvent::Lists(lists) => {
                let count = lists.len();
                let removed = self.mirror.apply_lists_snapshot(lists);
                self.proxy
                    .reconcile(self.mirror.lists())
                    .map_err(BoardError::Subscribe)?;
                tracing::debug!(lists = count, removed = removed.len(), "lists snapshot applied");
            }
            SyncEvent::Tasks { list_id, tasks } => {
                let count = tasks.len();
                if self.mirror.apply_tasks_snapshot(&list_id, tasks) {
                    tracing::debug!(list = %list_id, tasks = count, "tasks snapshot applied");
                }
            }
        }
        Ok(())
    }

    /// Applies every event already queued, without waiting.
    ///
    /// # Errors
    ///
    /// See [`handle_event`](Self::handle_event).
    pub fn drain_pending(&mut self) -> Result<usize, BoardError> {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Applies events until none arrives for `quiet`.
    ///
    /// # Errors
    ///
    /// See [`handle_event`](Self::handle_event).
    pub async fn settle(&mut self, quiet: Duration) -> Result<(), BoardError> {
        while let Ok(Some(event)) = tokio::time::timeout(quiet, self.events.recv()).await {
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Applies events until `done` holds for the mirror or `timeout` passes.
    ///
    /// Returns whether `done` held.
    ///
    /// # Errors
    ///
    /// See [`handle_event`](Self::handle_event).
    pub async fn sync_until(
        &mut self,
        done: impl Fn(&Mirror) -> bool,
        timeout: Duration,
    ) -> Result<bool, BoardError> {
        let deadline = Instant::now() + timeout;
        while !done(&self.mirror) {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => self.handle_event(event)?,
                Ok(None) | Err(_) => return Ok(false),
            }
        }
        Ok(true)
    }

    /// A draft titled `title` with the configured default priority.
    pub fn new_draft(&self, title: impl Into<String>) -> TaskDraft {
        TaskDraft {
            priority: self.settings.default_priority,
            ..TaskDraft::titled(title)
        }
    }

    /// Creates a list. The name is trimmed first.
    ///
    /// The list shows up in the mirror with the next lists snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a blank or too long name and
    /// [`BoardError::CommitFailed`] if the store rejects it.
    pub async fn add_list(&mut self, name: &str) -> Result<ListId, BoardError> {
        let name = name.trim();
        list::validate_name(name, self.settings.max_title_len)?;
        self.dispatcher.create_list(name).await
    }

    /// Appends a task to `list_id` with `order` equal to the current count.
    ///
    /// If the list's first tasks snapshot has not arrived yet, events are
    /// applied until it does, for up to [`FIRST_SNAPSHOT_WAIT`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a bad title,
    /// [`BoardError::UnknownList`] if the list is not on the board,
    /// [`BoardError::NotSynced`] if its tasks never arrived, and
    /// [`BoardError::CommitFailed`] if the store rejects the record.
    pub async fn add_task(&mut self, list_id: &ListId, draft: TaskDraft) -> Result<TaskId, BoardError> {
        draft.validate(self.settings.max_title_len)?;
        if self.mirror.list(list_id).is_none() {
            return Err(BoardError::UnknownList(list_id.clone()));
        }
        if self.mirror.sync_state(list_id).is_none() {
            let id = list_id.clone();
            self.sync_until(
                |m| m.sync_state(&id).is_some() || m.list(&id).is_none(),
                FIRST_SNAPSHOT_WAIT,
            )
            .await?;
            if self.mirror.list(list_id).is_none() {
                return Err(BoardError::UnknownList(list_id.clone()));
            }
            if self.mirror.sync_state(list_id).is_none() {
                return Err(BoardError::NotSynced(list_id.clone()));
            }
        }
        let order = u32::try_from(self.mirror.task_count(list_id)).unwrap_or(u32::MAX);
        self.dispatcher.create_task(list_id, &draft, order).await
    }

    /// Handles the end of a drag gesture.
    ///
    /// An aborted drag, a stale task or a drop that changes nothing is a
    /// no-op: no mirror change and no write.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CommitFailed`] if the store rejects the batch;
    /// the optimistic patch stays until the next snapshot.
    pub async fn on_drag_end(&mut self, event: &DragEvent) -> Result<DragOutcome, BoardError> {
        let Some(destination) = &event.destination else {
            return Ok(DragOutcome::NoOp);
        };
        let Some(plan) = reorder::plan(&self.mirror, &event.task_id, &event.source, destination)
        else {
            return Ok(DragOutcome::NoOp);
        };
        let writes = self.dispatcher.dispatch(&mut self.mirror, &plan).await?;
        Ok(DragOutcome::Applied { writes })
    }

    /// Looks up a list by display name, first match in creation order.
    #[must_use]
    pub fn find_list(&self, name: &str) -> Option<&List> {
        self.mirror.lists().iter().find(|l| l.name == name)
    }

    /// Stops syncing.
    pub fn close(mut self) {
        self.proxy.shutdown();
        tracing::info!(user = %self.user, "board closed");
    }
}
