//! User identity and profile record fields.

use serde::{Deserialize, Serialize};

/// Profile field: account email address.
pub const FIELD_EMAIL: &str = "email";
/// Profile field: server-stamped signup time.
pub const FIELD_SIGNUP_TIME: &str = "signupTime";

/// Stable identifier handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
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

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
