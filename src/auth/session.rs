//! Login session for the Twitch implicit grant
//!
//! [`AuthSession`] drives a single linear exchange: build the authorization
//! URL, wait for the redirect, check the CSRF state, attach the bearer token
//! and load the user profile. Sign-out revokes the token best-effort and
//! always clears local state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::authorize::AuthorizationRequest;
use crate::auth::nonce::{generate_state, state_matches};
use crate::auth::providers::{
    HelixDirectoryClient, TokenRevoker, TwitchRevoker, UserDirectoryClient,
};
use crate::auth::redirect::{RedirectBroker, RedirectOutcome};
use crate::auth::token::{Credential, SessionSnapshot, SessionStatus, UserProfile};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::events::{RecordedEvent, SessionEvent, SessionEvents};
use crate::http_client::{HttpClient, ReqwestHttpClient};

#[derive(Debug, Default)]
struct SessionState {
    status: SessionStatus,
    credential: Option<Credential>,
    user: Option<UserProfile>,
    signed_in_at: Option<DateTime<Utc>>,
}

/// Owns the login/logout exchange and the resulting credential state.
///
/// Construct one per process and share it behind an `Arc`.
pub struct AuthSession {
    config: AuthConfig,
    authorization_endpoint: Url,
    broker: Arc<dyn RedirectBroker>,
    directory: Arc<dyn UserDirectoryClient>,
    revoker: Arc<dyn TokenRevoker>,
    state: Mutex<SessionState>,
    events: SessionEvents,
}

impl AuthSession {
    /// Create a session from its collaborators
    pub fn new(
        config: AuthConfig,
        broker: Arc<dyn RedirectBroker>,
        directory: Arc<dyn UserDirectoryClient>,
        revoker: Arc<dyn TokenRevoker>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let authorization_endpoint = config.authorization_url()?;

        Ok(Self {
            config,
            authorization_endpoint,
            broker,
            directory,
            revoker,
            state: Mutex::new(SessionState::default()),
            events: SessionEvents::default(),
        })
    }

    /// Create a session talking to Twitch over HTTP
    pub fn twitch(config: AuthConfig, broker: Arc<dyn RedirectBroker>) -> AuthResult<Self> {
        let http_client: Arc<dyn HttpClient> = Arc::new(
            ReqwestHttpClient::with_timeout(config.http_timeout())
                .map_err(|e| AuthError::config("http_timeout_secs", format!("{:#}", e)))?,
        );
        let directory = Arc::new(HelixDirectoryClient::new(
            Arc::clone(&http_client),
            &config.api_base_url,
            &config.client_id,
        ));
        let revoker = Arc::new(TwitchRevoker::new(
            http_client,
            &config.revocation_endpoint,
            &config.client_id,
        ));

        Self::new(config, broker, directory, revoker)
    }

    /// Run the implicit-grant login.
    ///
    /// Only allowed while logged out; any other status yields
    /// [`AuthError::Busy`] and leaves the session untouched. Every failure
    /// ends in `LoggedOut` with no credential and no profile, including the
    /// returned future being dropped before completion.
    pub async fn sign_in(&self) -> AuthResult<UserProfile> {
        let attempt = Uuid::new_v4();
        let nonce = generate_state();

        self.transition(SessionStatus::LoggedOut, SessionStatus::LoggingIn, |state| {
            state.credential = Some(Credential::pending(nonce.clone()));
        })
        .inspect_err(|e| debug!(attempt = %attempt, error = %e, "Sign-in rejected"))?;
        info!(attempt = %attempt, "Starting Twitch sign-in");

        let guard = ResetGuard::new(self);

        match self.authorize_and_fetch(attempt, &nonce).await {
            Ok((user, access_token)) => {
                let signed_in_at = Utc::now();
                {
                    let mut state = self.lock_state();
                    state.status = SessionStatus::LoggedIn;
                    state.credential = Some(Credential {
                        access_token,
                        state: nonce,
                    });
                    state.user = Some(user.clone());
                    state.signed_in_at = Some(signed_in_at);
                }
                guard.disarm();

                info!(
                    attempt = %attempt,
                    user_id = user.id,
                    display_name = %user.display_name,
                    "Twitch sign-in completed"
                );
                self.events.publish(SessionEvent::StatusChanged {
                    status: SessionStatus::LoggedIn,
                });
                self.events.publish(SessionEvent::SignedIn { user: user.clone() });
                Ok(user)
            }
            Err(e) => {
                drop(guard);

                warn!(
                    attempt = %attempt,
                    code = %e.code(),
                    error = %e,
                    "Twitch sign-in failed"
                );
                self.events.publish(SessionEvent::SignInFailed {
                    code: e.code(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn authorize_and_fetch(
        &self,
        attempt: Uuid,
        nonce: &str,
    ) -> AuthResult<(UserProfile, String)> {
        let request = AuthorizationRequest {
            client_id: self.config.client_id.clone(),
            redirect_uri: self.broker.redirect_uri(),
            scopes: self.config.scopes.clone(),
            force_verify: self.config.force_verify,
            state: nonce.to_string(),
        };
        let auth_url = request.to_url(&self.authorization_endpoint);
        debug!(
            attempt = %attempt,
            redirect_uri = %request.redirect_uri,
            scopes = %request.scopes.join(" "),
            "Opening authorization URL"
        );

        let outcome = self
            .broker
            .authorize(&auth_url)
            .await
            .map_err(|e| AuthError::Redirect {
                reason: format!("{:#}", e),
            })?;

        let params = match outcome {
            RedirectOutcome::Success(params) => params,
            RedirectOutcome::Cancel | RedirectOutcome::Dismiss => {
                return Err(AuthError::Cancelled);
            }
            RedirectOutcome::Error { message } => {
                return Err(AuthError::CallbackDenied {
                    error: message,
                    description: None,
                });
            }
        };

        if let Some(error) = params.error {
            return Err(AuthError::CallbackDenied {
                error,
                description: params.error_description,
            });
        }

        if !state_matches(nonce, params.state.as_deref()) {
            return Err(AuthError::StateMismatch);
        }

        let access_token = params
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;

        self.directory.set_bearer_token(&access_token);
        let user = self.directory.fetch_current_user().await?;

        Ok((user, access_token))
    }

    /// Revoke the token and clear local state.
    ///
    /// A no-op when already logged out. Revocation failures and timeouts are
    /// logged and never keep the session from ending in `LoggedOut`.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let access_token = {
            let mut state = self.lock_state();
            match state.status {
                SessionStatus::LoggedOut => {
                    debug!("Sign-out requested while already logged out");
                    return Ok(());
                }
                SessionStatus::LoggingIn | SessionStatus::LoggingOut => {
                    return Err(AuthError::Busy {
                        status: state.status,
                    });
                }
                SessionStatus::LoggedIn => {}
            }
            state.status = SessionStatus::LoggingOut;
            state
                .credential
                .as_ref()
                .map(|credential| credential.access_token.clone())
                .unwrap_or_default()
        };
        self.events.publish(SessionEvent::StatusChanged {
            status: SessionStatus::LoggingOut,
        });
        info!("Signing out of Twitch");

        let guard = ResetGuard::new(self);
        let revoked = self.revoke(&access_token).await;
        drop(guard);

        self.events.publish(SessionEvent::SignedOut { revoked });
        info!(revoked, "Signed out of Twitch");
        Ok(())
    }

    async fn revoke(&self, access_token: &str) -> bool {
        if access_token.is_empty() {
            return false;
        }

        let limit = self.config.revocation_timeout();
        match tokio::time::timeout(limit, self.revoker.revoke(access_token)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %format!("{:#}", e), "Token revocation failed, clearing local session anyway");
                false
            }
            Err(_) => {
                warn!(
                    timeout_secs = limit.as_secs_f64(),
                    "Token revocation timed out, clearing local session anyway"
                );
                false
            }
        }
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.lock_state().status
    }

    /// Profile of the signed-in user
    pub fn user(&self) -> Option<UserProfile> {
        self.lock_state().user.clone()
    }

    pub fn is_logging_in(&self) -> bool {
        self.status() == SessionStatus::LoggingIn
    }

    pub fn is_logging_out(&self) -> bool {
        self.status() == SessionStatus::LoggingOut
    }

    pub fn is_logged_in(&self) -> bool {
        self.status() == SessionStatus::LoggedIn
    }

    /// Access token, present only while logged in or logging out
    pub fn access_token(&self) -> Option<String> {
        let state = self.lock_state();
        if !state.status.holds_token() {
            return None;
        }
        state
            .credential
            .as_ref()
            .filter(|credential| credential.is_authorized())
            .map(|credential| credential.access_token.clone())
    }

    /// Consistent view of everything presentation code reads
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            status: state.status,
            user: state.user.clone(),
            is_logging_in: state.status == SessionStatus::LoggingIn,
            is_logging_out: state.status == SessionStatus::LoggingOut,
            signed_in_at: state.signed_in_at,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Recently emitted events, oldest first
    pub fn recent_events(&self) -> Vec<RecordedEvent> {
        self.events.recent()
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Upper bound applied to token revocation
    pub fn revocation_timeout(&self) -> Duration {
        self.config.revocation_timeout()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically move `from` -> `to`, rejecting the call from any other status
    fn transition(
        &self,
        from: SessionStatus,
        to: SessionStatus,
        update: impl FnOnce(&mut SessionState),
    ) -> AuthResult<()> {
        {
            let mut state = self.lock_state();
            if state.status != from {
                return Err(AuthError::Busy {
                    status: state.status,
                });
            }
            state.status = to;
            update(&mut state);
        }
        self.events.publish(SessionEvent::StatusChanged { status: to });
        Ok(())
    }

    /// Drop credential, profile and bearer header; back to `LoggedOut`
    fn reset(&self) {
        let previous = {
            let mut state = self.lock_state();
            std::mem::take(&mut *state).status
        };
        self.directory.clear_bearer_token();

        if previous != SessionStatus::LoggedOut {
            self.events.publish(SessionEvent::StatusChanged {
                status: SessionStatus::LoggedOut,
            });
        }
    }
}

/// Resets the session on drop unless disarmed.
///
/// Covers early returns as well as the in-flight future being dropped.
struct ResetGuard<'a> {
    session: &'a AuthSession,
    armed: bool,
}

impl<'a> ResetGuard<'a> {
    fn new(session: &'a AuthSession) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.reset();
        }
    }
}
