use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Credential held for a single login attempt.
///
/// The `state` is the CSRF nonce sent with the authorization request. The
/// access token stays empty until the callback has been verified.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Bearer token returned in the redirect fragment
    pub access_token: String,
    /// CSRF nonce for this attempt only
    pub state: String,
}

impl Credential {
    /// Create a credential for an attempt that has not been answered yet
    pub fn pending(state: String) -> Self {
        Self {
            access_token: String::new(),
            state,
        }
    }

    /// Check if the credential carries a usable token
    pub fn is_authorized(&self) -> bool {
        !self.access_token.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Credential")
            .field("access_token", &token)
            .field("state", &self.state)
            .finish()
    }
}

/// Profile of the authenticated user as returned by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Numeric user id (Helix sends it as a string)
    #[serde(deserialize_with = "deserialize_user_id")]
    pub id: u64,
    /// Display name
    pub display_name: String,
    /// Email address, empty when the email scope was not granted
    #[serde(default)]
    pub email: String,
    /// Profile picture URL
    #[serde(rename = "profile_image_url", alias = "avatar_url", default)]
    pub avatar_url: String,
}

fn deserialize_user_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid user id '{}'", text))),
    }
}

/// Status of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No credential, no profile
    #[default]
    LoggedOut,
    /// Waiting on the redirect or the profile lookup
    LoggingIn,
    /// Token verified and profile loaded
    LoggedIn,
    /// Token is being revoked
    LoggingOut,
}

impl SessionStatus {
    /// Whether a token is expected to be held in this status
    pub fn holds_token(&self) -> bool {
        matches!(self, Self::LoggedIn | Self::LoggingOut)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::LoggedOut => write!(f, "logged_out"),
            SessionStatus::LoggingIn => write!(f, "logging_in"),
            SessionStatus::LoggedIn => write!(f, "logged_in"),
            SessionStatus::LoggingOut => write!(f, "logging_out"),
        }
    }
}

/// Read-only view of the session for presentation code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<UserProfile>,
    pub is_logging_in: bool,
    pub is_logging_out: bool,
    /// When the current login completed
    pub signed_in_at: Option<DateTime<Utc>>,
}
