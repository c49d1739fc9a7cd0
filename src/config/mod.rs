use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, AuthResult};

// Default configuration values
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://id.twitch.tv/oauth2/authorize";
const DEFAULT_REVOCATION_ENDPOINT: &str = "https://id.twitch.tv/oauth2/revoke";
const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv/helix";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000";
const DEFAULT_SCOPES: &[&str] = &["openid", "user:read:email", "user:read:follows"];
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_REVOCATION_TIMEOUT_SECONDS: u64 = 10;

/// Environment variable name for the Twitch Client ID
pub const TWITCH_CLIENT_ID_ENV: &str = "TWITCH_CLIENT_ID";

/// Configuration for the Twitch login session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Application client id registered with Twitch
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// OAuth2 authorization endpoint
    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,
    /// OAuth2 revocation endpoint
    #[serde(default = "default_revocation_endpoint")]
    pub revocation_endpoint: String,
    /// Base URL of the user directory API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Redirect URI registered with Twitch
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Scopes requested on every login
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Force the consent screen on every login
    #[serde(default = "default_force_verify")]
    pub force_verify: bool,
    /// Timeout for each HTTP request, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Upper bound on the revocation call during sign-out, in seconds
    #[serde(default = "default_revocation_timeout")]
    pub revocation_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|val| !val.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// Default functions
fn default_client_id() -> String {
    env_or(TWITCH_CLIENT_ID_ENV, "")
}

fn default_authorization_endpoint() -> String {
    env_or("TWITCH_AUTH_URL", DEFAULT_AUTHORIZATION_ENDPOINT)
}

fn default_revocation_endpoint() -> String {
    env_or("TWITCH_REVOKE_URL", DEFAULT_REVOCATION_ENDPOINT)
}

fn default_api_base_url() -> String {
    env_or("TWITCH_API_URL", DEFAULT_API_BASE_URL)
}

fn default_redirect_uri() -> String {
    env_or("TWITCH_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

fn default_scopes() -> Vec<String> {
    match std::env::var("TWITCH_SCOPES") {
        Ok(val) if !val.trim().is_empty() => val.split_whitespace().map(str::to_string).collect(),
        _ => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_force_verify() -> bool {
    true
}

fn default_http_timeout() -> u64 {
    std::env::var("TWITCH_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS)
}

fn default_revocation_timeout() -> u64 {
    std::env::var("TWITCH_REVOKE_TIMEOUT_SECS")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_REVOCATION_TIMEOUT_SECONDS)
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            authorization_endpoint: default_authorization_endpoint(),
            revocation_endpoint: default_revocation_endpoint(),
            api_base_url: default_api_base_url(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            force_verify: default_force_verify(),
            http_timeout_secs: default_http_timeout(),
            revocation_timeout_secs: default_revocation_timeout(),
        }
    }
}

impl AuthConfig {
    /// Create a configuration for `client_id` with the built-in Twitch endpoints
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            revocation_endpoint: DEFAULT_REVOCATION_ENDPOINT.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            force_verify: true,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECONDS,
            revocation_timeout_secs: DEFAULT_REVOCATION_TIMEOUT_SECONDS,
        }
    }

    /// Build the configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; missing keys fall back to the environment
    pub async fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AuthConfig = serde_json::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check required values, URL syntax and non-zero timeouts
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::config(
                "client_id",
                format!("{} is not set", TWITCH_CLIENT_ID_ENV),
            ));
        }
        if self.scopes.is_empty() {
            return Err(AuthError::config("scopes", "at least one scope is required"));
        }
        for (key, value) in [
            ("authorization_endpoint", &self.authorization_endpoint),
            ("revocation_endpoint", &self.revocation_endpoint),
            ("api_base_url", &self.api_base_url),
        ] {
            Url::parse(value).map_err(|e| AuthError::config(key, e.to_string()))?;
        }
        for (key, value) in [
            ("http_timeout_secs", self.http_timeout_secs),
            ("revocation_timeout_secs", self.revocation_timeout_secs),
        ] {
            if value == 0 {
                return Err(AuthError::config(key, "must be greater than zero"));
            }
        }
        Ok(())
    }

    /// Parsed authorization endpoint
    pub fn authorization_url(&self) -> AuthResult<Url> {
        Url::parse(&self.authorization_endpoint)
            .map_err(|e| AuthError::config("authorization_endpoint", e.to_string()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn revocation_timeout(&self) -> Duration {
        Duration::from_secs(self.revocation_timeout_secs)
    }
}
