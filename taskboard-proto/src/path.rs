//! Slash-separated record and collection paths.
//!
//! Path shape used by the board:
//!
//! ```text
//! users/{uid}
//! users/{uid}/lists/{listId}
//! users/{uid}/lists/{listId}/tasks/{taskId}
//! ```
//!
//! Collection paths have an odd number of segments, record paths an even
//! number.

use serde::{Deserialize, Serialize};

use crate::list::ListId;
use crate::task::TaskId;
use crate::user::UserId;

/// Top-level collection holding user profiles.
pub const USERS: &str = "users";
/// Per-user collection of lists.
pub const LISTS: &str = "lists";
/// Per-list collection of tasks.
pub const TASKS: &str = "tasks";

/// Path of a collection of records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionPath(String);

/// Path of a single record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocPath(String);

impl CollectionPath {
    /// A top-level collection.
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Path of the record with `id` inside this collection.
    #[must_use]
    pub fn doc(&self, id: &str) -> DocPath {
        DocPath(format!("{}/{id}", self.0))
    }

    /// Record owning this collection, if it is a sub-collection.
    #[must_use]
    pub fn parent(&self) -> Option<DocPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocPath(parent.to_string()))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocPath {
    /// Identifier of the record (last segment).
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, id)| id)
    }

    /// Collection containing this record.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        CollectionPath(
            self.0
                .rsplit_once('/')
                .map_or_else(String::new, |(parent, _)| parent.to_string()),
        )
    }

    /// Sub-collection `name` under this record.
    #[must_use]
    pub fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{name}", self.0))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `users`
#[must_use]
pub fn users() -> CollectionPath {
    CollectionPath::root(USERS)
}

/// `users/{uid}`
#[must_use]
pub fn user(uid: &UserId) -> DocPath {
    users().doc(uid.as_str())
}

/// `users/{uid}/lists`
#[must_use]
pub fn lists(uid: &UserId) -> CollectionPath {
    user(uid).collection(LISTS)
}

/// `users/{uid}/lists/{listId}`
#[must_use]
pub fn list(uid: &UserId, list_id: &ListId) -> DocPath {
    lists(uid).doc(list_id.as_str())
}

/// `users/{uid}/lists/{listId}/tasks`
#[must_use]
pub fn tasks(uid: &UserId, list_id: &ListId) -> CollectionPath {
    list(uid, list_id).collection(TASKS)
}

/// `users/{uid}/lists/{listId}/tasks/{taskId}`
#[must_use]
pub fn task(uid: &UserId, list_id: &ListId, task_id: &TaskId) -> DocPath {
    tasks(uid, list_id).doc(task_id.as_str())
}
