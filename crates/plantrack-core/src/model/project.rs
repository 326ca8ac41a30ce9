//! Normalized project records.
//!
//! Project records arrive in several shapes: planning-portal exports use
//! `planning_*` prefixed fields, hand-entered records use generic
//! `title`/`category`/`value`. [`Project::from_record`] resolves every
//! display field once, at ingestion, by walking a fixed candidate list per
//! field. Missing data degrades to literal fallbacks, never to `None`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::format::{self, truncate_chars};

/// Candidate id fields, highest priority first.
pub const ID_FIELDS: &[&str] = &["docId", "projectId", "planning_id", "id", "_id"];

/// Candidate title fields, highest priority first.
pub const TITLE_FIELDS: &[&str] = &["title", "planning_title", "planning_name", "name"];

/// Description fields used for the title fallback.
pub const DESCRIPTION_FIELDS: &[&str] = &["description", "planning_description"];

/// Explicit location fields, highest priority first.
pub const LOCATION_FIELDS: &[&str] = &["location", "planning_location"];

/// Address components joined when no explicit location is present.
pub const ADDRESS_FIELDS: &[&str] = &[
    "planning_development_address_1",
    "planning_development_address_2",
    "planning_development_address_3",
    "planning_development_address_4",
    "address",
    "planning_county",
    "county",
];

/// Candidate monetary fields; the first non-zero parse wins.
pub const VALUE_FIELDS: &[&str] = &["value", "planning_value", "estimated_value", "project_value"];

/// Candidate stage fields, highest priority first.
pub const STATUS_FIELDS: &[&str] = &["stage", "planning_stage", "status", "planning_status"];

/// Candidate category fields, highest priority first.
pub const CATEGORY_FIELDS: &[&str] = &[
    "category",
    "planning_category",
    "planning_development_category",
    "type",
];

pub const APPLICATION_DATE_FIELDS: &[&str] = &["planning_application_date", "application_date"];
pub const DECISION_DATE_FIELDS: &[&str] = &["planning_decision_date", "decision_date"];

pub const UNNAMED_PROJECT: &str = "Unnamed Project";
pub const NO_LOCATION: &str = "Location not specified";
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Characters of description kept by the title fallback.
pub const DESCRIPTION_TITLE_CHARS: usize = 30;

/// Canonical key for a project.
///
/// Records without any resolvable id get a random ephemeral key so they can
/// still be displayed and grouped, but they must never be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ProjectKey {
    Stored(String),
    Ephemeral(String),
}

impl ProjectKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stored(id) | Self::Ephemeral(id) => id,
        }
    }

    /// The id if it may be written to storage.
    #[must_use]
    pub fn stored(&self) -> Option<&str> {
        match self {
            Self::Stored(id) => Some(id),
            Self::Ephemeral(_) => None,
        }
    }

    fn ephemeral() -> Self {
        Self::Ephemeral(format!("local-{:016x}", rand::random::<u64>()))
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping/styling class derived from the category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryClass {
    Industrial,
    Residential,
    Commercial,
    Transport,
    Education,
    Healthcare,
    Other,
}

/// Keyword buckets in match order. First substring hit wins.
const CATEGORY_BUCKETS: &[(CategoryClass, &[&str])] = &[
    (CategoryClass::Industrial, &["industrial"]),
    (CategoryClass::Residential, &["residential"]),
    (CategoryClass::Commercial, &["commercial", "retail"]),
    (CategoryClass::Transport, &["transport", "road"]),
    (CategoryClass::Education, &["education"]),
    (CategoryClass::Healthcare, &["healthcare"]),
];

impl CategoryClass {
    /// Classify a free-text category by case-insensitive keyword match.
    #[must_use]
    pub fn classify(category: &str) -> Self {
        let lowered = category.to_lowercase();
        CATEGORY_BUCKETS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map_or(Self::Other, |(class, _)| *class)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Industrial => "industrial",
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::Transport => "transport",
            Self::Education => "education",
            Self::Healthcare => "healthcare",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for CategoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project with every display field resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub key: ProjectKey,
    pub title: String,
    pub category: String,
    pub category_class: CategoryClass,
    pub location: String,
    pub value: f64,
    pub status: String,
    pub application_date: Option<String>,
    pub decision_date: Option<String>,
    pub description: Option<String>,
    /// The record as ingested, kept for snapshots and exports.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl Project {
    /// Resolve a raw record into a [`Project`].
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let key = resolve_id(record).map_or_else(ProjectKey::ephemeral, ProjectKey::Stored);
        let category = first_text(record, CATEGORY_FIELDS)
            .map_or_else(|| format::UNCATEGORIZED.to_string(), |c| format::normalize_category(&c));

        Self {
            key,
            title: resolve_title(record),
            category_class: CategoryClass::classify(&category),
            category,
            location: resolve_location(record),
            value: resolve_value(record),
            status: resolve_status(record),
            application_date: first_text(record, APPLICATION_DATE_FIELDS),
            decision_date: first_text(record, DECISION_DATE_FIELDS),
            description: first_text(record, DESCRIPTION_FIELDS),
            raw: record.clone(),
        }
    }

    /// Resolve a JSON value; non-objects resolve like an empty record.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        value
            .as_object()
            .map_or_else(|| Self::from_record(&Map::new()), Self::from_record)
    }

    /// The id when it may be persisted.
    #[must_use]
    pub fn stored_id(&self) -> Option<&str> {
        self.key.stored()
    }

    /// Ordered label/value pairs for exports and detail views.
    #[must_use]
    pub fn display_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Project ID", self.key.to_string()),
            ("Title", self.title.clone()),
            ("Category", self.category.clone()),
            ("Location", self.location.clone()),
            ("Value", format::format_currency(self.value)),
            ("Status", self.status.clone()),
            (
                "Application Date",
                format::format_date(self.application_date.as_deref().unwrap_or_default()),
            ),
            (
                "Decision Date",
                format::format_date(self.decision_date.as_deref().unwrap_or_default()),
            ),
        ]
    }
}

/// Text form of a scalar field; blank strings and non-scalars are skipped.
fn field_text(record: &Map<String, Value>, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(record: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| field_text(record, f))
}

/// Canonical id by [`ID_FIELDS`] priority.
#[must_use]
pub fn resolve_id(record: &Map<String, Value>) -> Option<String> {
    first_text(record, ID_FIELDS)
}

/// Display title, falling back to a description excerpt then [`UNNAMED_PROJECT`].
#[must_use]
pub fn resolve_title(record: &Map<String, Value>) -> String {
    if let Some(title) = first_text(record, TITLE_FIELDS) {
        return title;
    }
    if let Some(description) = first_text(record, DESCRIPTION_FIELDS) {
        return format!("{}...", truncate_chars(&description, DESCRIPTION_TITLE_CHARS));
    }
    UNNAMED_PROJECT.to_string()
}

/// Explicit location, else joined address parts, else [`NO_LOCATION`].
#[must_use]
pub fn resolve_location(record: &Map<String, Value>) -> String {
    if let Some(location) = first_text(record, LOCATION_FIELDS) {
        return location;
    }

    let parts: Vec<String> = ADDRESS_FIELDS
        .iter()
        .filter_map(|f| field_text(record, f))
        .collect();
    if parts.is_empty() {
        NO_LOCATION.to_string()
    } else {
        parts.join(", ")
    }
}

/// First non-zero value among [`VALUE_FIELDS`], else `0.0`.
#[must_use]
pub fn resolve_value(record: &Map<String, Value>) -> f64 {
    VALUE_FIELDS
        .iter()
        .filter_map(|f| record.get(*f))
        .map(format::parse_money)
        .find(|v| v.abs() > 0.0)
        .unwrap_or(0.0)
}

/// Stage label by [`STATUS_FIELDS`] priority, else [`UNKNOWN_STATUS`].
#[must_use]
pub fn resolve_status(record: &Map<String, Value>) -> String {
    first_text(record, STATUS_FIELDS).unwrap_or_else(|| UNKNOWN_STATUS.to_string())
}
