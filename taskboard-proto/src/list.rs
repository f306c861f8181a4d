//! Named task lists.

use serde::{Deserialize, Serialize};

use crate::ValidationError;
use crate::document::{Document, Fields, Timestamp, Value, optional_timestamp, require_string};

/// Field: list display name.
pub const FIELD_NAME: &str = "name";
/// Field: creation time; lists are queried in ascending creation order.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Field: last time the list or one of its tasks was written.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// Store-assigned list identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListId(String);

impl ListId {
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

impl std::fmt::Display for ListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, ordered container of tasks owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    /// Store-assigned identifier.
    pub id: ListId,
    /// Display name.
    pub name: String,
    /// Creation time (zero until the server stamp is visible).
    pub created_at: Timestamp,
    /// Last touch time.
    pub updated_at: Timestamp,
}

impl List {
    /// Decodes a list record.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`](crate::document::DecodeError) if `name` is
    /// missing or any field has the wrong type.
    pub fn from_document(doc: &Document) -> Result<Self, crate::document::DecodeError> {
        Ok(Self {
            id: ListId::new(doc.id()),
            name: require_string(&doc.fields, FIELD_NAME)?,
            created_at: optional_timestamp(&doc.fields, FIELD_CREATED_AT)?.unwrap_or_default(),
            updated_at: optional_timestamp(&doc.fields, FIELD_UPDATED_AT)?.unwrap_or_default(),
        })
    }

    /// Fields for a new list record; both timestamps are server-stamped.
    #[must_use]
    pub fn creation_fields(name: &str) -> Fields {
        Fields::from([
            (FIELD_NAME.to_string(), Value::from(name)),
            (FIELD_CREATED_AT.to_string(), Value::ServerTimestamp),
            (FIELD_UPDATED_AT.to_string(), Value::ServerTimestamp),
        ])
    }

    /// Partial update that only bumps `updatedAt`.
    #[must_use]
    pub fn touch_fields() -> Fields {
        Fields::from([(FIELD_UPDATED_AT.to_string(), Value::ServerTimestamp)])
    }
}

/// Checks a list name before it is sent to the store.
///
/// # Errors
///
/// Returns [`ValidationError::NameEmpty`] for blank names and
/// [`ValidationError::NameTooLong`] past `max_len` characters.
pub fn validate_name(name: &str, max_len: usize) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if name.chars().count() > max_len {
        return Err(ValidationError::NameTooLong { max: max_len });
    }
    Ok(())
}
