//! Atomic multi-record write batches.
//!
//! A [`WriteBatch`] is built up front and handed to the store in one call;
//! the store applies every queued operation or none of them.

use crate::document::Fields;
use crate::path::DocPath;

/// One queued write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Merge `fields` into an existing record. Fails the batch if the record
    /// does not exist.
    Update {
        /// Target record.
        path: DocPath,
        /// Fields to overwrite.
        fields: Fields,
    },
    /// Write a full record, creating it if needed. With `merge`, fields not
    /// named here survive on an existing record.
    Set {
        /// Target record.
        path: DocPath,
        /// Record contents.
        fields: Fields,
        /// Keep unnamed fields of an existing record.
        merge: bool,
    },
    /// Remove a record. Removing a missing record is not an error.
    Delete {
        /// Target record.
        path: DocPath,
    },
}

impl WriteOp {
    /// Record targeted by this operation.
    #[must_use]
    pub const fn path(&self) -> &DocPath {
        match self {
            Self::Update { path, .. } | Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Builder for an all-or-nothing group of writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a partial update.
    pub fn update(&mut self, path: DocPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Update { path, fields });
        self
    }

    /// Queues a full-record write.
    pub fn set(&mut self, path: DocPath, fields: Fields, merge: bool) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            fields,
            merge,
        });
        self
    }

    /// Queues a deletion.
    pub fn delete(&mut self, path: DocPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    /// Queued operations in submission order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the batch, returning its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
