//! Tasks, priorities and task record encoding.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;
use crate::document::{
    DecodeError, Document, Fields, Timestamp, Value, optional_integer, optional_string,
    optional_timestamp, require_string,
};
use crate::list::ListId;

/// Default maximum task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Field: owning list.
pub const FIELD_LIST_ID: &str = "listId";
/// Field: title.
pub const FIELD_TITLE: &str = "title";
/// Field: free-form description.
pub const FIELD_DESC: &str = "desc";
/// Field: optional due date.
pub const FIELD_DUE_DATE: &str = "dueDate";
/// Field: numeric priority rank.
pub const FIELD_PRIORITY: &str = "priority";
/// Field: display rank within the owning list; tasks are queried by it.
pub const FIELD_ORDER: &str = "order";
/// Field: creation time.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Field: last write time.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// Store-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Priority tier of a task. The numeric rank is what gets stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Rank 1.
    High,
    /// Rank 2.
    #[default]
    Medium,
    /// Rank 3.
    Low,
}

impl Priority {
    /// All tiers, highest first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Stored numeric rank (High=1, Medium=2, Low=3).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Maps a stored rank back to a tier.
    #[must_use]
    pub const fn from_rank(rank: i64) -> Option<Self> {
        match rank {
            1 => Some(Self::High),
            2 => Some(Self::Medium),
            3 => Some(Self::Low),
            _ => None,
        }
    }

    /// Label used in drop-zone identifiers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for an unrecognised priority label.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown priority `{0}` (expected High, Medium or Low)")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParsePriorityError(s.to_string()))
    }
}

/// A single to-do item belonging to exactly one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Owning list.
    pub list_id: ListId,
    /// Title.
    pub title: String,
    /// Description, possibly empty.
    pub desc: String,
    /// Optional due date (midnight UTC of the chosen day).
    pub due_date: Option<Timestamp>,
    /// Priority tier.
    pub priority: Priority,
    /// Display rank, meaningful only among tasks of the same list.
    pub order: u32,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last write time.
    pub updated_at: Timestamp,
}

impl Task {
    /// Decodes a task record.
    ///
    /// The owning list comes from the `listId` field, or from the record path
    /// when the field is absent. A missing or out-of-range priority reads as
    /// [`Priority::Medium`]; a missing order reads as 0.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the title is missing, a field has the
    /// wrong type, or the path is not a task path.
    pub fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        let fields = &doc.fields;
        let list_id = match optional_string(fields, FIELD_LIST_ID)? {
            Some(id) => ListId::new(id),
            None => doc
                .path
                .parent()
                .parent()
                .map(|owner| ListId::new(owner.id()))
                .ok_or_else(|| DecodeError::BadPath(doc.path.to_string()))?,
        };
        let priority = optional_integer(fields, FIELD_PRIORITY)?
            .and_then(Priority::from_rank)
            .unwrap_or_default();
        let order = optional_integer(fields, FIELD_ORDER)?
            .map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX));

        Ok(Self {
            id: TaskId::new(doc.id()),
            list_id,
            title: require_string(fields, FIELD_TITLE)?,
            desc: optional_string(fields, FIELD_DESC)?.unwrap_or_default(),
            due_date: optional_timestamp(fields, FIELD_DUE_DATE)?,
            priority,
            order,
            created_at: optional_timestamp(fields, FIELD_CREATED_AT)?.unwrap_or_default(),
            updated_at: optional_timestamp(fields, FIELD_UPDATED_AT)?.unwrap_or_default(),
        })
    }

    /// Full record for an upsert. `updatedAt` is server-stamped.
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        Fields::from([
            (FIELD_LIST_ID.to_string(), Value::from(self.list_id.as_str())),
            (FIELD_TITLE.to_string(), Value::from(self.title.as_str())),
            (FIELD_DESC.to_string(), Value::from(self.desc.as_str())),
            (FIELD_DUE_DATE.to_string(), Value::from(self.due_date)),
            (
                FIELD_PRIORITY.to_string(),
                Value::Integer(i64::from(self.priority.rank())),
            ),
            (FIELD_ORDER.to_string(), Value::from(self.order)),
            (FIELD_CREATED_AT.to_string(), Value::from(self.created_at)),
            (FIELD_UPDATED_AT.to_string(), Value::ServerTimestamp),
        ])
    }

    /// Partial update for a changed display rank.
    #[must_use]
    pub fn order_fields(order: u32) -> Fields {
        Fields::from([
            (FIELD_ORDER.to_string(), Value::from(order)),
            (FIELD_UPDATED_AT.to_string(), Value::ServerTimestamp),
        ])
    }

    /// Partial update for a changed priority.
    #[must_use]
    pub fn priority_fields(priority: Priority) -> Fields {
        Fields::from([
            (
                FIELD_PRIORITY.to_string(),
                Value::Integer(i64::from(priority.rank())),
            ),
            (FIELD_UPDATED_AT.to_string(), Value::ServerTimestamp),
        ])
    }
}

/// User input for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title (required).
    pub title: String,
    /// Description.
    pub desc: String,
    /// Optional due date.
    pub due_date: Option<Timestamp>,
    /// Priority tier, Medium unless chosen.
    pub priority: Priority,
}

impl TaskDraft {
    /// A draft with just a title and default everything else.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Checks the title before anything is sent to the store.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] for a blank title and
    /// [`ValidationError::TitleTooLong`] past `max_len` characters.
    pub fn validate(&self, max_len: usize) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        if self.title.chars().count() > max_len {
            return Err(ValidationError::TitleTooLong { max: max_len });
        }
        Ok(())
    }

    /// Record for creating this task at the tail of `list_id`.
    #[must_use]
    pub fn creation_fields(&self, list_id: &ListId, order: u32) -> Fields {
        Fields::from([
            (FIELD_LIST_ID.to_string(), Value::from(list_id.as_str())),
            (FIELD_TITLE.to_string(), Value::from(self.title.as_str())),
            (FIELD_DESC.to_string(), Value::from(self.desc.as_str())),
            (FIELD_DUE_DATE.to_string(), Value::from(self.due_date)),
            (
                FIELD_PRIORITY.to_string(),
                Value::Integer(i64::from(self.priority.rank())),
            ),
            (FIELD_ORDER.to_string(), Value::from(order)),
            (FIELD_CREATED_AT.to_string(), Value::ServerTimestamp),
            (FIELD_UPDATED_AT.to_string(), Value::ServerTimestamp),
        ])
    }
}
