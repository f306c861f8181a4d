//! Shared data model for `Taskboard`: lists, tasks, document paths,
//! field values, write batches and the persisted store format.

pub mod batch;
pub mod codec;
pub mod document;
pub mod list;
pub mod path;
pub mod task;
pub mod user;

use thiserror::Error;

/// Client-side validation failures, raised before any remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Task title is empty or whitespace only.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the configured maximum.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Maximum allowed characters.
        max: usize,
    },
    /// List name is empty or whitespace only.
    #[error("list name cannot be empty")]
    NameEmpty,
    /// List name exceeds the configured maximum.
    #[error("list name too long (max {max} characters)")]
    NameTooLong {
        /// Maximum allowed characters.
        max: usize,
    },
}
