use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::providers::{TokenRevoker, UserDirectoryClient};
use crate::auth::token::UserProfile;
use crate::error::{AuthError, AuthResult};
use crate::http_client::HttpClient;

const AUTHORIZATION_HEADER: &str = "Authorization";
const CLIENT_ID_HEADER: &str = "Client-Id";

// Helix wraps every payload in a `data` array
#[derive(Debug, Deserialize)]
struct HelixResponse<T> {
    data: Vec<T>,
}

/// User directory backed by the Twitch Helix API
pub struct HelixDirectoryClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    default_headers: RwLock<HashMap<String, String>>,
}

impl HelixDirectoryClient {
    /// Create a client for `base_url` (e.g. `https://api.twitch.tv/helix`).
    ///
    /// `Client-Id` is sent with every request.
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: &str, client_id: &str) -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(CLIENT_ID_HEADER.to_string(), client_id.to_string());

        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: RwLock::new(default_headers),
        }
    }

    /// Snapshot of the headers that will be sent with the next request
    pub fn default_headers(&self) -> HashMap<String, String> {
        self.default_headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }
}

#[async_trait]
impl UserDirectoryClient for HelixDirectoryClient {
    fn set_bearer_token(&self, token: &str) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION_HEADER.to_string(), format!("Bearer {}", token));
    }

    fn clear_bearer_token(&self) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION_HEADER);
    }

    fn has_bearer_token(&self) -> bool {
        self.default_headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(AUTHORIZATION_HEADER)
    }

    async fn fetch_current_user(&self) -> AuthResult<UserProfile> {
        let url = self.users_url();
        let response = self
            .http_client
            .get(&url, self.default_headers())
            .await
            .map_err(|e| AuthError::network(format!("{:#}", e)))?;

        if !response.is_success() {
            warn!(
                status = response.status(),
                body = %response.body(),
                "User lookup rejected by Helix"
            );
            return Err(AuthError::ProfileFetchFailed {
                status: response.status(),
            });
        }

        let payload: HelixResponse<UserProfile> =
            response.json().map_err(|e| AuthError::MalformedProfile {
                reason: e.to_string(),
            })?;

        let user = payload
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::MalformedProfile {
                reason: "response contained no users".to_string(),
            })?;

        debug!(user_id = user.id, display_name = %user.display_name, "Fetched Twitch user");
        Ok(user)
    }
}

/// Revokes tokens at `https://id.twitch.tv/oauth2/revoke`
pub struct TwitchRevoker {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    client_id: String,
}

impl TwitchRevoker {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: &str, client_id: &str) -> Self {
        Self {
            http_client,
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
        }
    }
}

#[async_trait]
impl TokenRevoker for TwitchRevoker {
    async fn revoke(&self, access_token: &str) -> Result<()> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("token", access_token)
            .finish();

        let mut headers = HashMap::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );

        let response = self
            .http_client
            .post(&self.endpoint, headers, body)
            .await
            .context("Failed to revoke token")?;

        if !response.is_success() {
            return Err(anyhow!(
                "Failed to revoke token: HTTP {}: {}",
                response.status(),
                response.body()
            ));
        }

        debug!("Successfully revoked Twitch token");
        Ok(())
    }
}
