//! Tracked-project reconciliation.
//!
//! A tracked project is a `(user, project)` association stored as a document
//! in the tracked-projects collection. Two addressing schemes coexist in
//! storage:
//! - compound key: the document id is `{userId}_{projectId}`
//! - implicit: any document id, located by querying `userId` and `projectId`
//!
//! [`Tracker::track`] always writes the compound-key form (with both fields
//! set, so it is also visible to queries) and refuses to create a second
//! document for a pair that already exists under either scheme.
//!
//! [`Tracker::untrack`] walks an ordered list of [`UntrackStrategy`]s. Each
//! strategy reports a [`StepOutcome`]; failures are logged and the next
//! strategy runs. Exhausting the list without removing anything is
//! [`UntrackOutcome::NotFound`], which is a normal result, not an error, so a
//! repeated untrack of the same pair is a harmless no-op.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::CollectionsConfig;
use crate::dashboard;
use crate::error::{CoreError, ValidationError};
use crate::model::project::Project;
use crate::session::{Session, UserId};
use crate::store::{Document, DocumentStore, Filter};

pub const FIELD_USER_ID: &str = "userId";
pub const FIELD_PROJECT_ID: &str = "projectId";
pub const FIELD_TRACKED_AT: &str = "trackedAt";
pub const FIELD_PROJECT: &str = "project";

/// Document id of the compound-key scheme.
#[must_use]
pub fn compound_key(user_id: &UserId, project_id: &str) -> String {
    format!("{user_id}_{project_id}")
}

/// Whether `doc` records exactly this `(user, project)` pair.
///
/// Compound keys are ambiguous when ids contain `_`, so a document found by
/// id is only trusted once its fields agree.
fn records_pair(doc: &Document, user_id: &UserId, project_id: &str) -> bool {
    doc.str_field(FIELD_USER_ID) == Some(user_id.as_str())
        && doc.str_field(FIELD_PROJECT_ID) == Some(project_id)
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Result of one untrack strategy.
#[derive(Debug)]
pub enum StepOutcome {
    /// This strategy deleted `n` documents.
    Removed(usize),
    /// An external handler reported success; document count unknown.
    Delegated,
    /// Nothing to remove via this strategy.
    NotFound,
    /// The strategy failed; the next one should run.
    Failed(anyhow::Error),
}

/// Everything a strategy needs to act on one `(user, project)` pair.
pub struct UntrackContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub collection: &'a str,
    pub user_id: &'a UserId,
    pub project_id: &'a str,
}

/// One way of removing a tracked-project association.
pub trait UntrackStrategy {
    /// Short name used in logs and in [`UntrackOutcome::Removed`].
    fn name(&self) -> &'static str;

    fn attempt(&self, ctx: &UntrackContext<'_>) -> StepOutcome;
}

/// Externally supplied untrack handler (e.g. a parent view's own removal).
///
/// Returning `Ok(true)` ends the untrack immediately.
pub trait UntrackHook {
    /// # Errors
    ///
    /// Any error is logged and the built-in strategies take over.
    fn untrack(&self, user_id: &UserId, project_id: &str) -> anyhow::Result<bool>;
}

impl<F> UntrackHook for F
where
    F: Fn(&UserId, &str) -> anyhow::Result<bool>,
{
    fn untrack(&self, user_id: &UserId, project_id: &str) -> anyhow::Result<bool> {
        self(user_id, project_id)
    }
}

/// Delegates to an [`UntrackHook`].
pub struct DelegateToHook<H> {
    hook: H,
}

impl<H: UntrackHook> DelegateToHook<H> {
    pub const fn new(hook: H) -> Self {
        Self { hook }
    }
}

impl<H: UntrackHook> UntrackStrategy for DelegateToHook<H> {
    fn name(&self) -> &'static str {
        "hook"
    }

    fn attempt(&self, ctx: &UntrackContext<'_>) -> StepOutcome {
        match self.hook.untrack(ctx.user_id, ctx.project_id) {
            Ok(true) => StepOutcome::Delegated,
            Ok(false) => StepOutcome::NotFound,
            Err(e) => StepOutcome::Failed(e),
        }
    }
}

/// Deletes the `{userId}_{projectId}` document.
pub struct CompoundKeyDelete;

impl UntrackStrategy for CompoundKeyDelete {
    fn name(&self) -> &'static str {
        "compound-key"
    }

    fn attempt(&self, ctx: &UntrackContext<'_>) -> StepOutcome {
        let id = compound_key(ctx.user_id, ctx.project_id);
        match ctx.store.get_document(ctx.collection, &id) {
            Ok(Some(doc)) if records_pair(&doc, ctx.user_id, ctx.project_id) => {}
            Ok(Some(_)) => {
                debug!(doc_id = %id, "compound key holds another pair");
                return StepOutcome::NotFound;
            }
            Ok(None) => return StepOutcome::NotFound,
            Err(e) => return StepOutcome::Failed(e.into()),
        }
        match ctx.store.delete_document(ctx.collection, &id) {
            Ok(true) => StepOutcome::Removed(1),
            Ok(false) => StepOutcome::NotFound,
            Err(e) => StepOutcome::Failed(e.into()),
        }
    }
}

/// Queries on `userId`/`projectId` and deletes every match in one batch.
pub struct QueryDelete;

impl UntrackStrategy for QueryDelete {
    fn name(&self) -> &'static str {
        "query"
    }

    fn attempt(&self, ctx: &UntrackContext<'_>) -> StepOutcome {
        let filters = [
            Filter::eq(FIELD_USER_ID, ctx.user_id.as_str()),
            Filter::eq(FIELD_PROJECT_ID, ctx.project_id),
        ];
        let matches = match ctx.store.query(ctx.collection, &filters) {
            Ok(docs) => docs,
            Err(e) => return StepOutcome::Failed(e.into()),
        };
        if matches.is_empty() {
            return StepOutcome::NotFound;
        }

        let ids: Vec<String> = matches.into_iter().map(|d| d.id).collect();
        match ctx.store.delete_batch(ctx.collection, &ids) {
            Ok(0) => StepOutcome::NotFound,
            Ok(n) => StepOutcome::Removed(n),
            Err(e) => StepOutcome::Failed(e.into()),
        }
    }
}

/// Final result of [`Tracker::untrack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntrackOutcome {
    Removed {
        strategy: &'static str,
        /// `None` when an external hook did the removal.
        documents: Option<usize>,
    },
    NotFound,
}

impl UntrackOutcome {
    #[must_use]
    pub const fn removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Track/untrack operations for the session user.
pub struct Tracker<'a> {
    store: &'a dyn DocumentStore,
    session: Option<&'a Session>,
    collections: &'a CollectionsConfig,
    strategies: Vec<Box<dyn UntrackStrategy + 'a>>,
}

impl<'a> Tracker<'a> {
    /// Tracker using the compound-key then query strategies.
    pub fn new(
        store: &'a dyn DocumentStore,
        session: Option<&'a Session>,
        collections: &'a CollectionsConfig,
    ) -> Self {
        Self {
            store,
            session,
            collections,
            strategies: vec![Box::new(CompoundKeyDelete), Box::new(QueryDelete)],
        }
    }

    /// Try `hook` before any built-in strategy.
    #[must_use]
    pub fn with_hook<H: UntrackHook + 'a>(mut self, hook: H) -> Self {
        self.strategies.insert(0, Box::new(DelegateToHook::new(hook)));
        self
    }

    /// Replace the strategy list entirely.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn UntrackStrategy + 'a>>) -> Self {
        self.strategies = strategies;
        self
    }

    fn collection(&self) -> &str {
        &self.collections.tracked_projects
    }

    /// Start tracking `project`. Returns `false` if it was already tracked.
    ///
    /// # Errors
    ///
    /// Fails without a session, for projects without a persistent id, or
    /// when the store fails.
    pub fn track(&self, project: &Project) -> Result<bool, CoreError> {
        let user_id = crate::session::require_user(self.session)?;
        let project_id = project
            .stored_id()
            .ok_or_else(|| ValidationError::EphemeralProject(project.key.to_string()))?;

        if self.is_tracked(project_id)? {
            debug!(user_id = %user_id, project_id, "project already tracked");
            return Ok(false);
        }

        let mut data = Map::new();
        data.insert(FIELD_USER_ID.into(), Value::from(user_id.as_str()));
        data.insert(FIELD_PROJECT_ID.into(), Value::from(project_id));
        data.insert(
            FIELD_TRACKED_AT.into(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );
        data.insert(FIELD_PROJECT.into(), Value::Object(project.raw.clone()));

        // `is_tracked` already ruled out our own pair, so anything at the
        // compound key belongs to someone else.
        let id = compound_key(user_id, project_id);
        if self.store.get_document(self.collection(), &id)?.is_some() {
            warn!(
                user_id = %user_id,
                project_id,
                doc_id = %id,
                "compound key taken, storing under a generated id"
            );
            self.store.add_document(self.collection(), data)?;
        } else {
            self.store.set_document(self.collection(), &id, data)?;
        }
        self.invalidate_dashboard(user_id);

        info!(user_id = %user_id, project_id, "tracked project");
        Ok(true)
    }

    /// Whether the session user tracks `project_id` under either scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn is_tracked(&self, project_id: &str) -> Result<bool, CoreError> {
        let Some(session) = self.session else {
            return Ok(false);
        };
        let user_id = &session.user_id;

        let compound = self
            .store
            .get_document(self.collection(), &compound_key(user_id, project_id))?;
        if compound.is_some_and(|doc| records_pair(&doc, user_id, project_id)) {
            return Ok(true);
        }

        let filters = [
            Filter::eq(FIELD_USER_ID, user_id.as_str()),
            Filter::eq(FIELD_PROJECT_ID, project_id),
        ];
        Ok(!self.store.query(self.collection(), &filters)?.is_empty())
    }

    /// Remove the `(user, project_id)` association.
    ///
    /// Strategy failures never surface here; they are logged and the next
    /// strategy runs. When a strategy other than the query tier removes
    /// documents, query-scheme leftovers for the same pair are swept too and
    /// counted in `documents`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotSignedIn`] without a session.
    pub fn untrack(&self, project_id: &str) -> Result<UntrackOutcome, CoreError> {
        let user_id = crate::session::require_user(self.session)?;
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Ok(UntrackOutcome::NotFound);
        }

        let ctx = UntrackContext {
            store: self.store,
            collection: self.collection(),
            user_id,
            project_id,
        };

        for strategy in &self.strategies {
            let documents = match strategy.attempt(&ctx) {
                StepOutcome::Removed(n) => Some(n + sweep_query_scheme(&ctx, strategy.name())),
                StepOutcome::Delegated => None,
                StepOutcome::NotFound => {
                    debug!(strategy = strategy.name(), project_id, "nothing to untrack");
                    continue;
                }
                StepOutcome::Failed(error) => {
                    warn!(
                        strategy = strategy.name(),
                        user_id = %user_id,
                        project_id,
                        error = %error,
                        "untrack strategy failed, trying next"
                    );
                    continue;
                }
            };

            info!(
                strategy = strategy.name(),
                user_id = %user_id,
                project_id,
                "untracked project"
            );
            self.invalidate_dashboard(user_id);
            return Ok(UntrackOutcome::Removed {
                strategy: strategy.name(),
                documents,
            });
        }

        debug!(user_id = %user_id, project_id, "project was not tracked");
        Ok(UntrackOutcome::NotFound)
    }

    /// Untrack by a resolved project; ephemeral projects were never stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotSignedIn`] without a session.
    pub fn untrack_project(&self, project: &Project) -> Result<UntrackOutcome, CoreError> {
        match project.stored_id() {
            Some(id) => self.untrack(id),
            None => {
                crate::session::require_user(self.session)?;
                Ok(UntrackOutcome::NotFound)
            }
        }
    }

    /// The session user's tracked projects, oldest first, one per project id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn tracked_projects(&self) -> Result<Vec<Project>, CoreError> {
        let Some(session) = self.session else {
            return Ok(Vec::new());
        };

        let mut docs = self.store.query(
            self.collection(),
            &[Filter::eq(FIELD_USER_ID, session.user_id.as_str())],
        )?;
        docs.sort_by(|a, b| {
            a.str_field(FIELD_TRACKED_AT)
                .cmp(&b.str_field(FIELD_TRACKED_AT))
                .then_with(|| a.id.cmp(&b.id))
        });

        // Duplicates keep their first position but prefer the compound-key copy.
        let mut order: Vec<String> = Vec::new();
        let mut by_id: HashMap<String, (bool, Project)> = HashMap::new();
        for doc in &docs {
            let Some(project) = project_from_tracked(doc) else {
                continue;
            };
            let key = project.key.as_str().to_string();
            let canonical = doc.id == compound_key(&session.user_id, &key);
            match by_id.entry(key) {
                Entry::Vacant(slot) => {
                    order.push(slot.key().clone());
                    slot.insert((canonical, project));
                }
                Entry::Occupied(mut slot) => {
                    if canonical && !slot.get().0 {
                        slot.insert((canonical, project));
                    }
                }
            }
        }

        Ok(order
            .iter()
            .filter_map(|key| by_id.remove(key).map(|(_, project)| project))
            .collect())
    }

    fn invalidate_dashboard(&self, user_id: &UserId) {
        if let Err(e) =
            dashboard::invalidate_cache(self.store, &self.collections.dashboard, user_id)
        {
            warn!(user_id = %user_id, error = %e, "failed to invalidate dashboard cache");
        }
    }
}

/// Remove query-scheme documents left behind after `after` succeeded.
///
/// Failures are logged and count as nothing swept.
fn sweep_query_scheme(ctx: &UntrackContext<'_>, after: &'static str) -> usize {
    let sweep = QueryDelete;
    if after == sweep.name() {
        return 0;
    }
    match sweep.attempt(ctx) {
        StepOutcome::Removed(n) => {
            debug!(
                after,
                project_id = ctx.project_id,
                swept = n,
                "removed query-scheme leftovers"
            );
            n
        }
        StepOutcome::Delegated | StepOutcome::NotFound => 0,
        StepOutcome::Failed(error) => {
            warn!(
                after,
                user_id = %ctx.user_id,
                project_id = ctx.project_id,
                error = %error,
                "query-scheme sweep failed"
            );
            0
        }
    }
}

/// Rebuild a [`Project`] from a tracked-project document.
///
/// The document's `projectId` wins over whatever the snapshot resolves to.
fn project_from_tracked(doc: &Document) -> Option<Project> {
    let project_id = doc.str_field(FIELD_PROJECT_ID)?;

    let mut record = doc
        .data
        .get(FIELD_PROJECT)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    record.insert("docId".into(), Value::from(project_id));

    Some(Project::from_record(&record))
}
