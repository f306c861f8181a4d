//! Document store abstraction for `Taskboard`.
//!
//! Defines the [`DocumentStore`] trait the core is written against.
//! Concrete implementations include:
//! - [`memory::MemoryStore`]: in-process store used by the shell and tests,
//!   saved between runs by [`persist`]

pub mod memory;
pub mod persist;

use taskboard_proto::batch::WriteBatch;
use taskboard_proto::document::{Fields, Snapshot};
use taskboard_proto::path::{CollectionPath, DocPath};
use tokio::sync::mpsc;

/// Sort direction of an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// An ordered query over one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Collection to read.
    pub collection: CollectionPath,
    /// Field to order by. Records without it sort as null.
    pub order_by: String,
    /// Sort direction.
    pub direction: Direction,
}

impl Query {
    /// Ascending query on `field`.
    pub fn ascending(collection: CollectionPath, field: impl Into<String>) -> Self {
        Self {
            collection,
            order_by: field.into(),
            direction: Direction::Ascending,
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// An update targeted a record that does not exist.
    #[error("record not found: {0}")]
    NotFound(DocPath),

    /// The store refused the write; nothing was applied.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A live query. Each delivery is a full [`Snapshot`] of the result set.
///
/// Dropping the subscription cancels it.
#[derive(Debug)]
pub struct Subscription {
    query: Query,
    rx: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    /// Wraps the receiving end of a snapshot channel.
    #[must_use]
    pub const fn new(query: Query, rx: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { query, rx }
    }

    /// The query this subscription was opened with.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Waits for the next snapshot. Returns `None` once the store side has
    /// gone away.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Returns an already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }
}

/// Async ordered-collection service with atomic batches.
///
/// # Invariant
///
/// [`DocumentStore::commit`] applies every operation of the batch or none
/// of them. Snapshots for one subscription are delivered in commit order.
pub trait DocumentStore: Send + Sync {
    /// Opens a live query. The current result set is delivered right away,
    /// then again after every write that touches the collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot serve queries.
    fn subscribe(&self, query: Query) -> Result<Subscription, StoreError>;

    /// Creates a record with a store-assigned id, resolving server-timestamp
    /// sentinels. Returns the new record's path.
    fn create_record(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> impl std::future::Future<Output = Result<DocPath, StoreError>> + Send;

    /// Applies all operations of `batch` atomically.
    fn commit(
        &self,
        batch: WriteBatch,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
