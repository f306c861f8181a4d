//! Remote collection proxy.
//!
//! Turns the store's per-query subscriptions into one stream of typed
//! [`SyncEvent`]s for a signed-in user:
//!
//! ```text
//! users/{uid}/lists            (by createdAt) ──┐
//! users/{uid}/lists/A/tasks    (by order)     ──┼──→ SyncEvent channel ──→ Board
//! users/{uid}/lists/B/tasks    (by order)     ──┘
//! ```
//!
//! Each subscription is drained by its own forwarder task, so deliveries for
//! one list reach the channel in the order the store produced them. No
//! ordering is promised between different lists.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use taskboard_proto::document::Snapshot;
use taskboard_proto::list::{self, List, ListId};
use taskboard_proto::path;
use taskboard_proto::task::{self, Task};
use taskboard_proto::user::UserId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::{DocumentStore, Query, StoreError, Subscription};

/// A decoded snapshot, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Full, ordered set of the user's lists.
    Lists(Vec<List>),
    /// Full, ordered set of one list's tasks.
    Tasks {
        /// List whose subscription produced the snapshot.
        list_id: ListId,
        /// Tasks in query order, possibly with duplicates.
        tasks: Vec<Task>,
    },
}

/// Owns the live subscriptions of one user.
///
/// One forwarder for the lists query plus one per known list. Dropping the
/// proxy cancels all of them.
pub struct CollectionProxy<S> {
    store: Arc<S>,
    user: UserId,
    events: mpsc::UnboundedSender<SyncEvent>,
    lists_forwarder: Option<JoinHandle<()>>,
    task_forwarders: HashMap<ListId, JoinHandle<()>>,
}

impl<S: DocumentStore> CollectionProxy<S> {
    /// Subscribes to the user's lists and returns the merged event stream.
    ///
    /// Task subscriptions are opened later, by [`reconcile`](Self::reconcile),
    /// once the lists are known.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the lists query cannot be opened.
    pub fn start(
        store: Arc<S>,
        user: UserId,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SyncEvent>), StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = store.subscribe(Query::ascending(
            path::lists(&user),
            list::FIELD_CREATED_AT,
        ))?;
        let lists_forwarder = tokio::spawn(forward_lists(sub, tx.clone()));
        tracing::info!(user = %user, "list subscription started");

        Ok((
            Self {
                store,
                user,
                events: tx,
                lists_forwarder: Some(lists_forwarder),
                task_forwarders: HashMap::new(),
            },
            rx,
        ))
    }

    /// Matches task subscriptions to the current list set.
    ///
    /// Lists that disappeared lose their subscription; new lists get one.
    /// Subscriptions of lists present before and after are left running, so
    /// nothing already delivered for them is lost.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a new task query cannot be opened. Lists
    /// handled before the failure keep their subscriptions.
    pub fn reconcile(&mut self, lists: &[List]) -> Result<(), StoreError> {
        let wanted: HashSet<&ListId> = lists.iter().map(|l| &l.id).collect();

        self.task_forwarders.retain(|list_id, handle| {
            if wanted.contains(list_id) {
                true
            } else {
                handle.abort();
                tracing::debug!(list = %list_id, "task subscription torn down");
                false
            }
        });

        for list in lists {
            if self.task_forwarders.contains_key(&list.id) {
                continue;
            }
            let sub = self.store.subscribe(Query::ascending(
                path::tasks(&self.user, &list.id),
                task::FIELD_ORDER,
            ))?;
            let handle = tokio::spawn(forward_tasks(list.id.clone(), sub, self.events.clone()));
            self.task_forwarders.insert(list.id.clone(), handle);
            tracing::debug!(list = %list.id, "task subscription started");
        }
        Ok(())
    }

    /// Whether a task subscription is open for `list_id`.
    #[must_use]
    pub fn is_watching(&self, list_id: &ListId) -> bool {
        self.task_forwarders.contains_key(list_id)
    }

    /// Number of open task subscriptions.
    #[must_use]
    pub fn watched_lists(&self) -> usize {
        self.task_forwarders.len()
    }
}

impl<S> CollectionProxy<S> {
    /// Cancels every subscription.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.lists_forwarder.take() {
            handle.abort();
        }
        for (_, handle) in self.task_forwarders.drain() {
            handle.abort();
        }
    }
}

impl<S> Drop for CollectionProxy<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decodes a lists snapshot, skipping records that do not decode.
#[must_use]
pub fn decode_lists(snapshot: &Snapshot) -> Vec<List> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match List::from_document(doc) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(path = %doc.path, error = %e, "skipping undecodable list");
                None
            }
        })
        .collect()
}

/// Decodes a tasks snapshot, skipping records that do not decode.
#[must_use]
pub fn decode_tasks(snapshot: &Snapshot) -> Vec<Task> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match Task::from_document(doc) {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::warn!(path = %doc.path, error = %e, "skipping undecodable task");
                None
            }
        })
        .collect()
}

/// Background task: decode lists snapshots and forward them.
async fn forward_lists(mut sub: Subscription, events: mpsc::UnboundedSender<SyncEvent>) {
    while let Some(snapshot) = sub.next().await {
        if events.send(SyncEvent::Lists(decode_lists(&snapshot))).is_err() {
            break;
        }
    }
    tracing::trace!("list forwarder finished");
}

/// Background task: decode one list's task snapshots and forward them.
async fn forward_tasks(
    list_id: ListId,
    mut sub: Subscription,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    while let Some(snapshot) = sub.next().await {
        let event = SyncEvent::Tasks {
            list_id: list_id.clone(),
            tasks: decode_tasks(&snapshot),
        };
        if events.send(event).is_err() {
            break;
        }
    }
    tracing::trace!(list = %list_id, "task forwarder finished");
}
