use std::fmt;

use crate::store::StoreError;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotSignedIn,
    ConfigParseError,
    ProjectIdMissing,
    ProjectNotFound,
    NoteNotFound,
    EmptyNote,
    NoteTooLong,
    InvalidUserId,
    StoreUnavailable,
    CorruptDocument,
    ProfileRequestFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotSignedIn => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ProjectIdMissing => "E2001",
            Self::ProjectNotFound => "E2002",
            Self::NoteNotFound => "E2003",
            Self::EmptyNote => "E2004",
            Self::NoteTooLong => "E2005",
            Self::InvalidUserId => "E2006",
            Self::StoreUnavailable => "E3001",
            Self::CorruptDocument => "E3002",
            Self::ProfileRequestFailed => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotSignedIn => "No signed-in user",
            Self::ConfigParseError => "Config file parse error",
            Self::ProjectIdMissing => "Project has no persistent identifier",
            Self::ProjectNotFound => "Project not found",
            Self::NoteNotFound => "Note not found",
            Self::EmptyNote => "Note text is empty",
            Self::NoteTooLong => "Note text is too long",
            Self::InvalidUserId => "Invalid user id",
            Self::StoreUnavailable => "Document store unavailable",
            Self::CorruptDocument => "Stored document is malformed",
            Self::ProfileRequestFailed => "Profile API request failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotSignedIn => Some("Pass --user or set PLANTRACK_USER."),
            Self::ConfigParseError => Some("Fix syntax in .plantrack/config.toml and retry."),
            Self::ProjectIdMissing => {
                Some("Add a docId, projectId or planning_id field to the record.")
            }
            Self::ProjectNotFound => Some("Import the project first with `pt project import`."),
            Self::NoteNotFound | Self::InternalUnexpected => None,
            Self::EmptyNote => Some("Provide some note text."),
            Self::NoteTooLong => Some("Shorten the note or raise [notes] max_chars."),
            Self::InvalidUserId => Some("User ids must be non-empty."),
            Self::StoreUnavailable => Some("Check the store path and retry."),
            Self::CorruptDocument => Some("Remove or re-import the affected document."),
            Self::ProfileRequestFailed => {
                Some("Check [api] base_url and that PLANTRACK_TOKEN is valid.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Input rejected before any storage call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("note text must not be empty")]
    EmptyNote,

    #[error("note text must be <= {max} characters (got {got})")]
    NoteTooLong { max: usize, got: usize },

    #[error("project '{0}' has no persistent identifier")]
    EphemeralProject(String),

    #[error("project id must not be empty")]
    EmptyProjectId,

    #[error("user id must not be empty")]
    EmptyUserId,
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyNote => ErrorCode::EmptyNote,
            Self::NoteTooLong { .. } => ErrorCode::NoteTooLong,
            Self::EphemeralProject(_) | Self::EmptyProjectId => ErrorCode::ProjectIdMissing,
            Self::EmptyUserId => ErrorCode::InvalidUserId,
        }
    }
}

/// Errors surfaced by tracking, notes and dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no signed-in user")]
    NotSignedIn,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("note '{0}' not found")]
    NoteNotFound(String),

    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotSignedIn => ErrorCode::NotSignedIn,
            Self::Validation(v) => v.code(),
            Self::NoteNotFound(_) => ErrorCode::NoteNotFound,
            Self::ProjectNotFound(_) => ErrorCode::ProjectNotFound,
            Self::Store(s) => s.code(),
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotSignedIn,
            ErrorCode::ConfigParseError,
            ErrorCode::ProjectIdMissing,
            ErrorCode::ProjectNotFound,
            ErrorCode::NoteNotFound,
            ErrorCode::EmptyNote,
            ErrorCode::NoteTooLong,
            ErrorCode::InvalidUserId,
            ErrorCode::StoreUnavailable,
            ErrorCode::CorruptDocument,
            ErrorCode::ProfileRequestFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::NoteTooLong.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn validation_errors_carry_their_codes() {
        let err = CoreError::from(ValidationError::NoteTooLong { max: 500, got: 501 });
        assert_eq!(err.code(), ErrorCode::NoteTooLong);
        assert_eq!(err.to_string(), "note text must be <= 500 characters (got 501)");
        assert!(err.hint().is_some());
    }
}
