//! Signed-in user context.
//!
//! Services receive the session explicitly at construction; there is no
//! process-wide "current user".

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, ValidationError};

/// Non-empty, trimmed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyUserId`] for blank input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in user plus the bearer token for REST calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub token: Option<String>,
}

impl Session {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }
}

/// The session's user, or [`CoreError::NotSignedIn`].
///
/// # Errors
///
/// Returns [`CoreError::NotSignedIn`] when `session` is `None`.
pub fn require_user(session: Option<&Session>) -> Result<&UserId, CoreError> {
    session.map(|s| &s.user_id).ok_or(CoreError::NotSignedIn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_are_trimmed_and_non_empty() {
        assert_eq!(UserId::new("  alice ").expect("valid").as_str(), "alice");
        assert_eq!(UserId::new("   "), Err(ValidationError::EmptyUserId));
    }

    #[test]
    fn blank_tokens_are_dropped() {
        let user = UserId::new("alice").expect("valid");
        assert!(Session::new(user.clone()).with_token("  ").token.is_none());
        assert_eq!(
            Session::new(user).with_token("abc").token.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn missing_session_is_not_signed_in() {
        assert!(matches!(require_user(None), Err(CoreError::NotSignedIn)));
    }
}
