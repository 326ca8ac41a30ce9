//! Dashboard summaries: counts by status and value by category.
//!
//! Every summary is a pure function of a project list and an optional
//! precomputed [`DashboardCache`]. A non-empty cached distribution is
//! returned verbatim; otherwise the distribution is recomputed from the
//! projects. Groups keep first-seen order in both paths, so a cache built
//! from a list and a recomputation over the same list are identical.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::model::project::Project;
use crate::session::UserId;
use crate::store::{DocumentStore, StoreError};

/// Label reported by [`top_status`] for an empty project list.
pub const NO_STATUS: &str = "None";

/// Chart-ready parallel label/value arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl Distribution {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Add `amount` to `label`, appending the label on first sight.
    pub fn accumulate(&mut self, label: &str, amount: f64) {
        if let Some(idx) = self.labels.iter().position(|l| l == label) {
            self.data[idx] += amount;
        } else {
            self.labels.push(label.to_string());
            self.data.push(amount);
        }
    }

    /// Label/value pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.data.iter().copied())
    }
}

/// The most common status and its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopStatus {
    pub status: String,
    pub count: usize,
}

impl TopStatus {
    fn none() -> Self {
        Self {
            status: NO_STATUS.to_string(),
            count: 0,
        }
    }
}

/// Count projects per resolved status, in first-seen order.
#[must_use]
pub fn status_counts(projects: &[Project]) -> Distribution {
    let mut dist = Distribution::default();
    for project in projects {
        dist.accumulate(&project.status, 1.0);
    }
    dist
}

/// Sum resolved value per category label, in first-seen order.
#[must_use]
pub fn category_values(projects: &[Project]) -> Distribution {
    let mut dist = Distribution::default();
    for project in projects {
        dist.accumulate(&project.category, project.value);
    }
    dist
}

/// Sum of resolved values; unparseable values already resolved to zero.
#[must_use]
pub fn total_value(projects: &[Project]) -> f64 {
    projects.iter().map(|p| p.value).sum()
}

/// Highest-count status; ties go to the status seen first.
#[must_use]
pub fn top_status(projects: &[Project]) -> TopStatus {
    top_of(&status_counts(projects))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn top_of(dist: &Distribution) -> TopStatus {
    let mut best: Option<(&str, f64)> = None;
    for (label, count) in dist.iter() {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((label, count));
        }
    }

    best.filter(|(_, count)| *count > 0.0)
        .map_or_else(TopStatus::none, |(status, count)| TopStatus {
            status: status.to_string(),
            count: count.round() as usize,
        })
}

/// Precomputed summary persisted per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCache {
    pub status_counts: Distribution,
    pub category_values: Distribution,
    pub total_value: f64,
    pub project_count: usize,
    pub updated_at: String,
}

impl DashboardCache {
    #[must_use]
    pub fn build(projects: &[Project]) -> Self {
        Self {
            status_counts: status_counts(projects),
            category_values: category_values(projects),
            total_value: total_value(projects),
            project_count: projects.len(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Summaries over one project list, preferring cached distributions.
#[derive(Debug, Clone, Copy)]
pub struct Dashboard<'a> {
    projects: &'a [Project],
    cache: Option<&'a DashboardCache>,
}

impl<'a> Dashboard<'a> {
    #[must_use]
    pub const fn new(projects: &'a [Project], cache: Option<&'a DashboardCache>) -> Self {
        Self { projects, cache }
    }

    #[must_use]
    pub fn project_distribution(&self) -> Distribution {
        match self.cache {
            Some(cache) if !cache.status_counts.is_empty() => cache.status_counts.clone(),
            _ => status_counts(self.projects),
        }
    }

    #[must_use]
    pub fn value_distribution(&self) -> Distribution {
        match self.cache {
            Some(cache) if !cache.category_values.is_empty() => cache.category_values.clone(),
            _ => category_values(self.projects),
        }
    }

    #[must_use]
    pub fn total_value(&self) -> f64 {
        total_value(self.projects)
    }

    /// Top status of the distribution shown on the status chart.
    #[must_use]
    pub fn top_status(&self) -> TopStatus {
        top_of(&self.project_distribution())
    }
}

/// Persist `cache` as the user's dashboard document.
///
/// # Errors
///
/// Returns an error if encoding or the store fails.
pub fn save_cache(
    store: &dyn DocumentStore,
    collection: &str,
    user_id: &UserId,
    cache: &DashboardCache,
) -> Result<(), StoreError> {
    match serde_json::to_value(cache)? {
        Value::Object(data) => store.set_document(collection, user_id.as_str(), data),
        _ => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: user_id.to_string(),
            reason: "dashboard cache did not encode as an object".into(),
        }),
    }
}

/// Load the user's cached summary. Malformed documents are ignored.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn load_cache(
    store: &dyn DocumentStore,
    collection: &str,
    user_id: &UserId,
) -> Result<Option<DashboardCache>, StoreError> {
    let Some(doc) = store.get_document(collection, user_id.as_str())? else {
        return Ok(None);
    };

    match serde_json::from_value::<DashboardCache>(Value::Object(doc.data)) {
        Ok(cache) => Ok(Some(cache)),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "ignoring malformed dashboard cache");
            Ok(None)
        }
    }
}

/// Drop the user's cached summary, returning whether one existed.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn invalidate_cache(
    store: &dyn DocumentStore,
    collection: &str,
    user_id: &UserId,
) -> Result<bool, StoreError> {
    store.delete_document(collection, user_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn projects(values: &[Value]) -> Vec<Project> {
        values.iter().map(Project::from_value).collect()
    }

    #[test]
    fn top_status_of_empty_list_is_sentinel() {
        assert_eq!(
            top_status(&[]),
            TopStatus {
                status: "None".into(),
                count: 0
            }
        );
    }

    #[test]
    fn top_status_counts_stages() {
        let ps = projects(&[json!({"stage": "A"}), json!({"stage": "A"}), json!({"stage": "B"})]);
        assert_eq!(
            top_status(&ps),
            TopStatus {
                status: "A".into(),
                count: 2
            }
        );
    }

    #[test]
    fn top_status_ties_go_to_first_seen() {
        let ps = projects(&[
            json!({"stage": "B"}),
            json!({"stage": "A"}),
            json!({"stage": "A"}),
            json!({"stage": "B"}),
        ]);
        assert_eq!(top_status(&ps).status, "B");
    }

    #[test]
    fn distributions_keep_first_seen_order() {
        let ps = projects(&[
            json!({"planning_stage": "Tender", "category": "Retail", "value": "€100"}),
            json!({"category": "Industrial", "value": 50}),
            json!({"planning_stage": "Tender", "category": "Retail", "value": "25.5"}),
        ]);

        let by_status = status_counts(&ps);
        assert_eq!(by_status.labels, vec!["Tender", "Unknown"]);
        assert_eq!(by_status.data, vec![2.0, 1.0]);

        let by_category = category_values(&ps);
        assert_eq!(by_category.labels, vec!["Retail", "Industrial"]);
        assert_eq!(by_category.data, vec![125.5, 50.0]);

        assert!((total_value(&ps) - 175.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cache_wins_when_present_and_non_empty() {
        let ps = projects(&[json!({"stage": "Live"})]);
        let mut cache = DashboardCache::build(&projects(&[json!({"stage": "Old"})]));

        let dash = Dashboard::new(&ps, Some(&cache));
        assert_eq!(dash.project_distribution().labels, vec!["Old"]);
        assert_eq!(dash.top_status().status, "Old");

        cache.status_counts = Distribution::default();
        let dash = Dashboard::new(&ps, Some(&cache));
        assert_eq!(dash.project_distribution().labels, vec!["Live"]);
    }

    #[test]
    fn recomputation_matches_cache_built_from_same_list() {
        let ps = projects(&[
            json!({"category": "Education", "planning_value": "€3,000,000"}),
            json!({"category": "Healthcare", "value": 12.25}),
            json!({"category": "Education", "value": "TBC"}),
        ]);
        let cache = DashboardCache::build(&ps);

        let cached = Dashboard::new(&ps, Some(&cache));
        let fresh = Dashboard::new(&ps, None);
        assert_eq!(cached.value_distribution(), fresh.value_distribution());
        assert_eq!(cached.project_distribution(), fresh.project_distribution());
    }

    #[test]
    fn cache_round_trips_through_store() {
        let store = MemoryStore::new();
        let user = UserId::new("alice").expect("valid");
        let cache = DashboardCache::build(&projects(&[json!({"stage": "A", "value": 10})]));

        save_cache(&store, "dashboardStats", &user, &cache).expect("save");
        let loaded = load_cache(&store, "dashboardStats", &user)
            .expect("load")
            .expect("present");
        assert_eq!(loaded, cache);

        assert!(invalidate_cache(&store, "dashboardStats", &user).expect("invalidate"));
        assert!(load_cache(&store, "dashboardStats", &user).expect("load").is_none());
    }

    #[test]
    fn malformed_cache_is_ignored() {
        let store = MemoryStore::new();
        let user = UserId::new("alice").expect("valid");
        store
            .set_document(
                "dashboardStats",
                "alice",
                json!({"statusCounts": 3}).as_object().expect("object").clone(),
            )
            .expect("seed");

        assert!(load_cache(&store, "dashboardStats", &user).expect("load").is_none());
    }
}
