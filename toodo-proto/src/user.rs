//! Identity types for `TooDo`.
//!
//! A [`Principal`] is the authenticated account as reported by the hosted
//! identity service. It is immutable within a session and replaced wholesale
//! when the sign-in state changes.

use serde::{Deserialize, Serialize};

/// Opaque identifier assigned to an account by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier from its string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this user ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated account, as supplied by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque account identifier.
    pub uid: UserId,
    /// Email address the account was created with.
    pub email: String,
    /// When the account was created (milliseconds since epoch).
    pub created_at: u64,
    /// When the account last signed in (milliseconds since epoch).
    pub last_sign_in: u64,
}
