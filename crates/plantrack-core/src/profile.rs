//! Client for the user profile REST endpoint.
//!
//! The profile lives behind `{base_url}/api/users/profile` rather than in
//! the document store. Every call carries the session's bearer token.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ErrorCode;
use crate::session::Session;

const PROFILE_PATH: &str = "/api/users/profile";

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("no API token for the signed-in user")]
    MissingToken,

    #[error("profile API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("profile API unreachable: {0}")]
    Transport(String),

    #[error("profile API response could not be decoded: {0}")]
    Decode(String),
}

impl ProfileError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingToken => ErrorCode::NotSignedIn,
            Self::Api { .. } | Self::Transport(_) | Self::Decode(_) => {
                ErrorCode::ProfileRequestFailed
            }
        }
    }
}

/// Profile document as exchanged with the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Fields this client does not know about, passed through on update.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Blocking profile API client.
pub struct ProfileClient {
    agent: ureq::Agent,
    endpoint: String,
    token: Option<String>,
}

impl ProfileClient {
    #[must_use]
    pub fn new(api: &ApiConfig, session: &Session) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("plantrack/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            endpoint: format!("{}{PROFILE_PATH}", api.base_url.trim_end_matches('/')),
            token: session.token.clone(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// See [`ProfileError`].
    pub fn get_profile(&self) -> Result<UserProfile, ProfileError> {
        let request = self.request("GET")?;
        Self::finish(request.call())
    }

    /// Create the profile (POST).
    ///
    /// # Errors
    ///
    /// See [`ProfileError`].
    pub fn create_profile(&self, profile: &UserProfile) -> Result<UserProfile, ProfileError> {
        let request = self.request("POST")?;
        Self::finish(request.send_json(profile))
    }

    /// Replace the profile (PUT).
    ///
    /// # Errors
    ///
    /// See [`ProfileError`].
    pub fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ProfileError> {
        let request = self.request("PUT")?;
        Self::finish(request.send_json(profile))
    }

    fn request(&self, method: &str) -> Result<ureq::Request, ProfileError> {
        let token = self.token.as_deref().ok_or(ProfileError::MissingToken)?;
        debug!(method, endpoint = %self.endpoint, "profile request");

        Ok(self
            .agent
            .request(method, &self.endpoint)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {token}")))
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<UserProfile, ProfileError> {
        match result {
            Ok(response) => response
                .into_json::<UserProfile>()
                .map_err(|e| ProfileError::Decode(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                let message = error_message(status, &body);
                warn!(status, message = %message, "profile request rejected");
                Err(ProfileError::Api { status, message })
            }
            Err(ureq::Error::Transport(t)) => Err(ProfileError::Transport(t.to_string())),
        }
    }
}

/// Message from a `{"message": ...}` error body, else the raw body, else
/// the status line.
fn error_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}
