//! Document-store abstraction.
//!
//! The tracking, notes and dashboard layers only ever talk to a
//! [`DocumentStore`]: named collections of JSON documents addressed by
//! string ids, with equality queries on top-level fields.
//!
//! Two backends ship with the crate:
//! - [`memory::MemoryStore`] for tests and throwaway sessions
//! - [`sqlite::SqliteStore`] for the CLI's on-disk state

pub mod memory;
pub mod sqlite;

use rand::Rng;
use serde_json::{Map, Value};

use crate::error::ErrorCode;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Length of ids produced by [`generate_id`].
pub const GENERATED_ID_LEN: usize = 20;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("document {collection}/{id} is malformed: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Sqlite(_) | Self::Unavailable(_) => ErrorCode::StoreUnavailable,
            Self::Encoding(_) | Self::Corrupt { .. } => ErrorCode::CorruptDocument,
        }
    }
}

/// A stored document: its id plus its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    #[must_use]
    pub const fn new(id: String, data: Map<String, Value>) -> Self {
        Self { id, data }
    }

    /// Top-level string field, if present and a string.
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `data` satisfies this filter.
    #[must_use]
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

/// Collection-oriented JSON document store.
///
/// Implementations must accept arbitrary string ids (including compound
/// `user_project` ids) and AND-combine every filter passed to [`query`].
///
/// [`query`]: DocumentStore::query
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or fully replace the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Delete the document at `id`, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete_document(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All documents in `collection` matching every filter, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;

    /// Insert a document under a freshly generated id and return that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn add_document(&self, collection: &str, data: Map<String, Value>)
    -> Result<String, StoreError>;

    /// Delete several documents atomically, returning how many existed.
    ///
    /// Either every listed document is removed or none is.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails; nothing is deleted in that case.
    fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<usize, StoreError>;
}

/// Generate a random alphanumeric document id.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_ID_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = generate_id();
        assert_eq!(id.len(), GENERATED_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn filter_requires_exact_value() {
        let data = json!({"userId": "u1", "projectId": "42"});
        let data = data.as_object().expect("object").clone();

        assert!(Filter::eq("userId", "u1").matches(&data));
        assert!(!Filter::eq("projectId", 42).matches(&data));
        assert!(!Filter::eq("missing", "x").matches(&data));
    }
}
