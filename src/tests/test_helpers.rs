//! Shared test utilities for session tests

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use crate::auth::providers::{HelixDirectoryClient, TwitchRevoker};
use crate::auth::redirect::{CallbackParams, RedirectBroker, RedirectOutcome};
use crate::config::AuthConfig;
use crate::http_client::mock::MockHttpClient;
use crate::AuthSession;

pub const TEST_CLIENT_ID: &str = "test_client_id";
pub const TEST_REDIRECT_URI: &str = "https://auth.expo.io/@test/app";
pub const USERS_URL: &str = "https://api.twitch.tv/helix/users";
pub const REVOKE_URL: &str = "https://id.twitch.tv/oauth2/revoke";
pub const USER_BODY: &str =
    r#"{"data":[{"id":1,"display_name":"x","email":"x@x","profile_image_url":"u"}]}"#;

/// What the scripted broker does on the next `authorize` call
#[derive(Clone)]
pub enum BrokerScript {
    /// Succeed, echoing the state found in the authorization URL
    EchoState { access_token: String },
    /// Resolve with a fixed outcome
    Outcome(RedirectOutcome),
    /// Fail inside the broker
    Fail(String),
    /// Never resolve
    Pending,
    /// Signal `entered`, wait for `release`, then echo the state
    Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        access_token: String,
    },
}

/// Redirect broker driven by a script instead of a browser
pub struct ScriptedBroker {
    script: Mutex<BrokerScript>,
    urls: Mutex<Vec<Url>>,
}

impl ScriptedBroker {
    pub fn new(script: BrokerScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn echo(access_token: &str) -> Arc<Self> {
        Self::new(BrokerScript::EchoState {
            access_token: access_token.to_string(),
        })
    }

    pub fn outcome(outcome: RedirectOutcome) -> Arc<Self> {
        Self::new(BrokerScript::Outcome(outcome))
    }

    pub fn set_script(&self, script: BrokerScript) {
        *self.script.lock().unwrap() = script;
    }

    /// Authorization URLs seen so far
    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }

    /// State sent with the most recent authorization URL
    pub fn last_state(&self) -> Option<String> {
        self.urls().last().and_then(state_from_url)
    }
}

pub fn state_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
}

fn echo_outcome(url: &Url, access_token: &str) -> RedirectOutcome {
    RedirectOutcome::Success(CallbackParams {
        access_token: Some(access_token.to_string()),
        state: state_from_url(url),
        token_type: Some("bearer".to_string()),
        ..Default::default()
    })
}

#[async_trait]
impl RedirectBroker for ScriptedBroker {
    fn redirect_uri(&self) -> String {
        TEST_REDIRECT_URI.to_string()
    }

    async fn authorize(&self, auth_url: &Url) -> Result<RedirectOutcome> {
        self.urls.lock().unwrap().push(auth_url.clone());
        let script = self.script.lock().unwrap().clone();

        match script {
            BrokerScript::EchoState { access_token } => Ok(echo_outcome(auth_url, &access_token)),
            BrokerScript::Outcome(outcome) => Ok(outcome),
            BrokerScript::Fail(message) => Err(anyhow!(message)),
            BrokerScript::Pending => std::future::pending().await,
            BrokerScript::Gated {
                entered,
                release,
                access_token,
            } => {
                entered.notify_one();
                release.notified().await;
                Ok(echo_outcome(auth_url, &access_token))
            }
        }
    }
}

/// Configuration pointing at the default Twitch endpoints
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::new(TEST_CLIENT_ID);
    config.revocation_timeout_secs = 1;
    config
}

/// Build a session over the scripted broker and mock HTTP client.
///
/// Also returns the directory client so tests can inspect its headers.
pub fn build_session(
    broker: Arc<ScriptedBroker>,
    http: Arc<MockHttpClient>,
) -> (AuthSession, Arc<HelixDirectoryClient>) {
    let config = test_config();
    let directory = Arc::new(HelixDirectoryClient::new(
        http.clone(),
        &config.api_base_url,
        &config.client_id,
    ));
    let revoker = Arc::new(TwitchRevoker::new(
        http,
        &config.revocation_endpoint,
        &config.client_id,
    ));
    let session = AuthSession::new(config, broker, directory.clone(), revoker)
        .expect("test config is valid");
    (session, directory)
}

/// Mock HTTP client with a valid user lookup and a working revocation endpoint
pub fn happy_http() -> Arc<MockHttpClient> {
    let http = Arc::new(MockHttpClient::new());
    http.mock_response(USERS_URL, 200, USER_BODY);
    http.mock_response(REVOKE_URL, 200, "");
    http
}
