pub mod dashboard;
pub mod note;
pub mod profile;
pub mod project;
pub mod track;

use std::path::PathBuf;

use anyhow::Context as _;
use plantrack_core::Session;
use plantrack_core::config::{CollectionsConfig, EffectiveConfig};
use plantrack_core::store::SqliteStore;

use crate::output::OutputMode;

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
    pub session: Option<Session>,
}

impl Context {
    pub fn collections(&self) -> &CollectionsConfig {
        &self.config.project.collections
    }

    pub fn store_path(&self) -> PathBuf {
        self.config.project.store_path(&self.root)
    }

    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        let path = self.store_path();
        SqliteStore::open(&path).with_context(|| format!("open store at {}", path.display()))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}
