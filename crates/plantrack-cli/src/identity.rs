//! Signed-in user resolution for CLI commands.
//!
//! The resolution chain: `--user` flag > `PLANTRACK_USER` env > `user` in the
//! user config file. The bearer token for the profile API comes from
//! `PLANTRACK_TOKEN`. Read-only commands work without a user; mutating
//! commands fail with a not-signed-in error.

use plantrack_core::config::UserConfig;
use plantrack_core::{Session, UserId};
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn resolve_user_with(
    cli_flag: Option<&str>,
    user_config: &UserConfig,
    env: &dyn EnvReader,
) -> Option<UserId> {
    cli_flag
        .and_then(|flag| UserId::new(flag).ok())
        .or_else(|| env.get("PLANTRACK_USER").and_then(|v| UserId::new(v).ok()))
        .or_else(|| {
            user_config
                .user
                .as_deref()
                .and_then(|v| UserId::new(v).ok())
        })
}

fn resolve_session_with(
    cli_flag: Option<&str>,
    user_config: &UserConfig,
    env: &dyn EnvReader,
) -> Option<Session> {
    let user_id = resolve_user_with(cli_flag, user_config, env)?;
    let session = Session::new(user_id);
    Some(match env.get("PLANTRACK_TOKEN") {
        Some(token) => session.with_token(token),
        None => session,
    })
}

/// Resolve the session, or `None` when no user identity is available.
pub fn resolve_session(cli_flag: Option<&str>, user_config: &UserConfig) -> Option<Session> {
    let session = resolve_session_with(cli_flag, user_config, &RealEnv);
    if let Some(s) = &session {
        tracing::debug!(user_id = %s.user_id, has_token = s.token.is_some(), "resolved session");
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockEnv {
        vars: HashMap<String, String>,
    }

    impl MockEnv {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn var(mut self, key: &str, val: &str) -> Self {
            self.vars.insert(key.to_string(), val.to_string());
            self
        }
    }

    impl EnvReader for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).filter(|v| !v.trim().is_empty()).cloned()
        }
    }

    fn config_user(user: &str) -> UserConfig {
        UserConfig {
            output: None,
            user: Some(user.to_string()),
        }
    }

    #[test]
    fn cli_flag_takes_priority() {
        let env = MockEnv::new().var("PLANTRACK_USER", "env-user");
        let user = resolve_user_with(Some("flag-user"), &config_user("cfg-user"), &env);
        assert_eq!(user.map(String::from).as_deref(), Some("flag-user"));
    }

    #[test]
    fn env_beats_config() {
        let env = MockEnv::new().var("PLANTRACK_USER", "env-user");
        let user = resolve_user_with(None, &config_user("cfg-user"), &env);
        assert_eq!(user.map(String::from).as_deref(), Some("env-user"));
    }

    #[test]
    fn blank_flag_falls_through() {
        let user = resolve_user_with(Some("  "), &config_user("cfg-user"), &MockEnv::new());
        assert_eq!(user.map(String::from).as_deref(), Some("cfg-user"));
    }

    #[test]
    fn nothing_resolves_to_no_session() {
        let session = resolve_session_with(None, &UserConfig::default(), &MockEnv::new());
        assert!(session.is_none());
    }

    #[test]
    fn token_attaches_to_session() {
        let env = MockEnv::new()
            .var("PLANTRACK_USER", "alice")
            .var("PLANTRACK_TOKEN", "abc123");
        let session = resolve_session_with(None, &UserConfig::default(), &env).expect("session");
        assert_eq!(session.user_id.as_str(), "alice");
        assert_eq!(session.token.as_deref(), Some("abc123"));
    }
}
