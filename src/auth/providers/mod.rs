use anyhow::Result;
use async_trait::async_trait;

use crate::auth::token::UserProfile;
use crate::error::AuthResult;

pub mod twitch;

pub use twitch::{HelixDirectoryClient, TwitchRevoker};

/// Client for the provider's user directory.
///
/// Holds default headers for every request, including the bearer token once
/// a login has been verified.
#[async_trait]
pub trait UserDirectoryClient: Send + Sync {
    /// Attach `Authorization: Bearer <token>` to subsequent requests
    fn set_bearer_token(&self, token: &str);

    /// Remove the bearer header from the default configuration
    fn clear_bearer_token(&self);

    /// Whether a bearer header is currently configured
    fn has_bearer_token(&self) -> bool;

    /// Fetch the profile of the user owning the bearer token
    async fn fetch_current_user(&self) -> AuthResult<UserProfile>;
}

/// Revokes access tokens at the provider
#[async_trait]
pub trait TokenRevoker: Send + Sync {
    /// Invalidate `access_token`
    async fn revoke(&self, access_token: &str) -> Result<()>;
}
