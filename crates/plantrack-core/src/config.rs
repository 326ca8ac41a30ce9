use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Directory holding per-workspace state and config.
pub const STATE_DIR: &str = ".plantrack";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub collections: CollectionsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    #[serde(default = "default_note_max_chars")]
    pub max_chars: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            max_chars: default_note_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file, relative to the workspace root unless absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    #[serde(default = "default_projects_collection")]
    pub projects: String,
    #[serde(default = "default_tracked_collection")]
    pub tracked_projects: String,
    #[serde(default = "default_notes_collection")]
    pub notes: String,
    #[serde(default = "default_dashboard_collection")]
    pub dashboard: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            projects: default_projects_collection(),
            tracked_projects: default_tracked_collection(),
            notes: default_notes_collection(),
            dashboard: default_dashboard_collection(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default signed-in user when neither flag nor env supplies one.
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

impl ProjectConfig {
    /// Absolute store path for a workspace rooted at `root`.
    #[must_use]
    pub fn store_path(&self, root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            root.join(&self.store.path)
        }
    }
}

/// Load `.plantrack/config.toml`, or defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(STATE_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the per-user config from the platform config directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("plantrack/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge workspace config, user config and environment.
///
/// # Errors
///
/// Returns an error if either config file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_note_max_chars() -> usize {
    500
}

fn default_store_path() -> PathBuf {
    PathBuf::from(STATE_DIR).join("store.db")
}

fn default_projects_collection() -> String {
    "projects".to_string()
}

fn default_tracked_collection() -> String {
    "trackedProjects".to_string()
}

fn default_notes_collection() -> String {
    "notes".to_string()
}

fn default_dashboard_collection() -> String {
    "dashboardStats".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:5000".to_string()
}

const fn default_api_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.notes.max_chars, 500);
        assert_eq!(cfg.collections.tracked_projects, "trackedProjects");
        assert_eq!(cfg.collections.notes, "notes");
        assert_eq!(
            cfg.store_path(root.path()),
            root.path().join(".plantrack/store.db")
        );
    }

    #[test]
    fn partial_project_config_keeps_other_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(STATE_DIR);
        std::fs::create_dir_all(&dir).expect("create state dir");
        std::fs::write(
            dir.join("config.toml"),
            "[notes]\nmax_chars = 280\n\n[store]\npath = \"/var/lib/plantrack/store.db\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg.notes.max_chars, 280);
        assert_eq!(
            cfg.store_path(root.path()),
            PathBuf::from("/var/lib/plantrack/store.db")
        );
        assert_eq!(cfg.collections.projects, "projects");
        assert_eq!(cfg.api.timeout_secs, 10);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(STATE_DIR);
        std::fs::create_dir_all(&dir).expect("create state dir");
        std::fs::write(dir.join("config.toml"), "[notes\nmax_chars = ").expect("write config");

        let err = load_project_config(root.path()).expect_err("parse must fail");
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_beats_user_config_and_aliases_normalize() {
        let output = resolve_output(false, Some("json".to_string()), Some("human".to_string()));
        assert_eq!(output, "pretty");

        let output = resolve_output(false, Some("plain".to_string()), Some("bogus".to_string()));
        assert_eq!(output, "text");
    }

    #[test]
    fn user_config_parses_default_user() {
        let cfg: UserConfig =
            toml::from_str("output = \"json\"\nuser = \"alice\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(cfg.user.as_deref(), Some("alice"));
    }
}
