use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::Document;

pub const FIELD_USER_ID: &str = "userId";
pub const FIELD_PROJECT_ID: &str = "projectId";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// A note one user attached to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Note {
    /// Decode a stored note; documents missing owner, project or text are skipped.
    #[must_use]
    pub fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.id.clone(),
            project_id: doc.str_field(FIELD_PROJECT_ID)?.to_string(),
            user_id: doc.str_field(FIELD_USER_ID)?.to_string(),
            text: doc.str_field(FIELD_TEXT)?.to_string(),
            created_at: doc.str_field(FIELD_CREATED_AT).map(str::to_string),
            updated_at: doc.str_field(FIELD_UPDATED_AT).map(str::to_string),
        })
    }

    /// Stored fields (the id is the document key, not a field).
    #[must_use]
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(FIELD_USER_ID.into(), Value::from(self.user_id.as_str()));
        data.insert(FIELD_PROJECT_ID.into(), Value::from(self.project_id.as_str()));
        data.insert(FIELD_TEXT.into(), Value::from(self.text.as_str()));
        if let Some(ts) = &self.created_at {
            data.insert(FIELD_CREATED_AT.into(), Value::from(ts.as_str()));
        }
        if let Some(ts) = &self.updated_at {
            data.insert(FIELD_UPDATED_AT.into(), Value::from(ts.as_str()));
        }
        data
    }
}
