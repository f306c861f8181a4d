//! Document-store value types.
//!
//! A record in the store is a flat map of named [`Value`]s. Subscriptions
//! deliver [`Snapshot`]s: the complete, ordered result set of a query at one
//! point in time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::{CollectionPath, DocPath};

/// Millisecond-precision UTC timestamp.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A single field value.
///
/// Variant order doubles as the cross-type sort order used by ordered
/// queries (`Null` sorts first).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// UTF-8 string.
    String(String),
    /// Concrete timestamp.
    Timestamp(Timestamp),
    /// Sentinel replaced by the store's commit time when written.
    ServerTimestamp,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Named fields of a record.
pub type Fields = BTreeMap<String, Value>;

/// A record as delivered by a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Full path of the record.
    pub path: DocPath,
    /// Stored fields.
    pub fields: Fields,
}

impl Document {
    /// Creates a document from its path and fields.
    #[must_use]
    pub const fn new(path: DocPath, fields: Fields) -> Self {
        Self { path, fields }
    }

    /// Store-assigned identifier (last path segment).
    #[must_use]
    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// Complete ordered result set of one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Collection the query ran against.
    pub collection: CollectionPath,
    /// Matching records in query order.
    pub documents: Vec<Document>,
}

/// Errors raised when a record cannot be turned into a typed value.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field holds a value of an unexpected type.
    #[error("field `{field}` should be {expected}")]
    WrongType {
        /// Field name.
        field: &'static str,
        /// Human-readable expected type.
        expected: &'static str,
    },
    /// The record path does not have the expected shape.
    #[error("unexpected record path: {0}")]
    BadPath(String),
}

/// Reads a required string field.
///
/// # Errors
///
/// Returns [`DecodeError::MissingField`] or [`DecodeError::WrongType`].
pub fn require_string(fields: &Fields, field: &'static str) -> Result<String, DecodeError> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "a string",
        }),
        None => Err(DecodeError::MissingField(field)),
    }
}

/// Reads an optional string field; a missing or null field yields `None`.
///
/// # Errors
///
/// Returns [`DecodeError::WrongType`] if the field is present but not a string.
pub fn optional_string(fields: &Fields, field: &'static str) -> Result<Option<String>, DecodeError> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

/// Reads an optional integer field.
///
/// # Errors
///
/// Returns [`DecodeError::WrongType`] if the field is present but not an integer.
pub fn optional_integer(fields: &Fields, field: &'static str) -> Result<Option<i64>, DecodeError> {
    match fields.get(field) {
        Some(Value::Integer(n)) => Ok(Some(*n)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "an integer",
        }),
    }
}

/// Reads a timestamp field leniently.
///
/// Records written with a server-timestamp sentinel that has not been
/// resolved yet, or written without the field at all, read as `None`.
///
/// # Errors
///
/// Returns [`DecodeError::WrongType`] for any non-timestamp value.
pub fn optional_timestamp(
    fields: &Fields,
    field: &'static str,
) -> Result<Option<Timestamp>, DecodeError> {
    match fields.get(field) {
        Some(Value::Timestamp(t)) => Ok(Some(*t)),
        Some(Value::Null | Value::ServerTimestamp) | None => Ok(None),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "a timestamp",
        }),
    }
}
