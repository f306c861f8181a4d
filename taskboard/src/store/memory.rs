//! In-process document store.
//!
//! Keeps every record in one ordered map and pushes full snapshots to
//! subscribers over [`tokio::sync::mpsc`] channels after each write. Batches
//! are staged on a copy of the map and swapped in only when every operation
//! succeeded, which gives the all-or-nothing commit the core relies on.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use taskboard_proto::batch::{WriteBatch, WriteOp};
use taskboard_proto::codec::StoreState;
use taskboard_proto::document::{Document, Fields, Snapshot, Timestamp, Value};
use taskboard_proto::path::{CollectionPath, DocPath};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Direction, DocumentStore, Query, StoreError, Subscription};

/// A registered live query.
struct Subscriber {
    query: Query,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Inner {
    documents: BTreeMap<DocPath, Fields>,
    subscribers: Vec<Subscriber>,
    /// Last server timestamp handed out; stamps are strictly increasing.
    last_stamp: Timestamp,
    /// Reason for rejecting the next commit, if armed.
    reject_next: Option<String>,
    write_attempts: u64,
}

/// In-memory [`DocumentStore`].
///
/// Thread-safe via a [`Mutex`] that is never held across an await point.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with previously exported records.
    #[must_use]
    pub fn from_state(state: StoreState) -> Self {
        let last_stamp = state
            .documents
            .iter()
            .flat_map(|(_, fields)| fields.values())
            .filter_map(|v| match v {
                Value::Timestamp(t) => Some(*t),
                _ => None,
            })
            .max()
            .unwrap_or_default();
        Self {
            inner: Mutex::new(Inner {
                documents: state.documents.into_iter().collect(),
                last_stamp,
                ..Inner::default()
            }),
        }
    }

    /// Copies every record out for persistence.
    #[must_use]
    pub fn export_state(&self) -> StoreState {
        let inner = self.inner.lock();
        StoreState {
            documents: inner
                .documents
                .iter()
                .map(|(path, fields)| (path.clone(), fields.clone()))
                .collect(),
        }
    }

    /// Reads one record directly, bypassing subscriptions.
    #[must_use]
    pub fn document(&self, path: &DocPath) -> Option<Fields> {
        self.inner.lock().documents.get(path).cloned()
    }

    /// Number of subscriptions whose receiving side is still alive.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.inner
            .lock()
            .subscribers
            .iter()
            .filter(|s| !s.tx.is_closed())
            .count()
    }

    /// Number of `create_record` and `commit` calls seen so far, including
    /// rejected ones.
    #[must_use]
    pub fn write_attempts(&self) -> u64 {
        self.inner.lock().write_attempts
    }

    /// Makes the next write fail with [`StoreError::Rejected`].
    pub fn fail_next_write(&self, reason: impl Into<String>) {
        self.inner.lock().reject_next = Some(reason.into());
    }

    fn commit_now(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.write_attempts += 1;
        if let Some(reason) = inner.reject_next.take() {
            tracing::warn!(ops = batch.len(), %reason, "rejecting batch");
            return Err(StoreError::Rejected(reason));
        }

        let stamp = inner.stamp();
        let mut staged = inner.documents.clone();
        let mut touched = BTreeSet::new();
        let ops = batch.len();

        for op in batch.into_ops() {
            touched.insert(op.path().parent());
            match op {
                WriteOp::Update { path, fields } => {
                    let Some(existing) = staged.get_mut(&path) else {
                        tracing::debug!(%path, "update of missing record, batch aborted");
                        return Err(StoreError::NotFound(path));
                    };
                    existing.extend(resolve(fields, stamp));
                }
                WriteOp::Set {
                    path,
                    fields,
                    merge,
                } => {
                    let fields = resolve(fields, stamp);
                    if merge {
                        staged.entry(path).or_default().extend(fields);
                    } else {
                        staged.insert(path, fields);
                    }
                }
                WriteOp::Delete { path } => {
                    staged.remove(&path);
                }
            }
        }

        inner.documents = staged;
        inner.notify(&touched);
        drop(inner);
        tracing::debug!(ops, "batch committed");
        Ok(())
    }

    fn create_now(&self, collection: &CollectionPath, fields: Fields) -> Result<DocPath, StoreError> {
        let mut inner = self.inner.lock();
        inner.write_attempts += 1;
        if let Some(reason) = inner.reject_next.take() {
            tracing::warn!(%collection, %reason, "rejecting record creation");
            return Err(StoreError::Rejected(reason));
        }

        let path = collection.doc(&Uuid::now_v7().to_string());
        let stamp = inner.stamp();
        inner.documents.insert(path.clone(), resolve(fields, stamp));
        inner.notify(&BTreeSet::from([collection.clone()]));
        drop(inner);
        tracing::debug!(%path, "record created");
        Ok(path)
    }
}

impl Inner {
    fn stamp(&mut self) -> Timestamp {
        let now = Timestamp::now();
        let next = if now > self.last_stamp {
            now
        } else {
            Timestamp::from_millis(self.last_stamp.as_millis() + 1)
        };
        self.last_stamp = next;
        next
    }

    /// Sends a fresh snapshot to every subscriber of a touched collection and
    /// forgets subscribers that have hung up.
    fn notify(&mut self, touched: &BTreeSet<CollectionPath>) {
        let documents = &self.documents;
        self.subscribers.retain(|sub| {
            if touched.contains(&sub.query.collection) {
                sub.tx.send(snapshot(documents, &sub.query)).is_ok()
            } else {
                !sub.tx.is_closed()
            }
        });
    }
}

/// Replaces server-timestamp sentinels with the commit stamp.
fn resolve(mut fields: Fields, stamp: Timestamp) -> Fields {
    for value in fields.values_mut() {
        if *value == Value::ServerTimestamp {
            *value = Value::Timestamp(stamp);
        }
    }
    fields
}

/// Runs `query` against `documents`. Ties on the ordering field fall back to
/// record path so results are deterministic.
fn snapshot(documents: &BTreeMap<DocPath, Fields>, query: &Query) -> Snapshot {
    let mut matches: Vec<(&DocPath, &Fields)> = documents
        .iter()
        .filter(|(path, _)| path.parent() == query.collection)
        .collect();
    matches.sort_by(|(pa, fa), (pb, fb)| {
        let key = fa
            .get(&query.order_by)
            .cmp(&fb.get(&query.order_by));
        let key = match query.direction {
            Direction::Ascending => key,
            Direction::Descending => key.reverse(),
        };
        key.then_with(|| pa.cmp(pb))
    });
    Snapshot {
        collection: query.collection.clone(),
        documents: matches
            .into_iter()
            .map(|(path, fields)| Document::new(path.clone(), fields.clone()))
            .collect(),
    }
}

impl DocumentStore for MemoryStore {
    fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // The receiver is alive, so the initial send cannot fail.
        let _ = tx.send(snapshot(&inner.documents, &query));
        inner.subscribers.push(Subscriber {
            query: query.clone(),
            tx,
        });
        drop(inner);
        tracing::trace!(collection = %query.collection, "subscription opened");
        Ok(Subscription::new(query, rx))
    }

    async fn create_record(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocPath, StoreError> {
        self.create_now(collection, fields)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.commit_now(batch)
    }
}
