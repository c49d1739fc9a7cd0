//! Redirect handling for the implicit grant
//!
//! A [`RedirectBroker`] opens the authorization URL somewhere the user can
//! act on it and resolves once the provider redirects back. The callback
//! parameters arrive in the URL fragment on success and in the query on
//! some error redirects, so [`CallbackParams`] reads both.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// Parameters carried back by the provider redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    pub access_token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl CallbackParams {
    /// Parse `key=value&...` pairs (form encoded), ignoring unknown keys
    pub fn from_pairs(input: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "access_token" => params.access_token = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                "scope" => params.scope = value,
                "token_type" => params.token_type = value,
                _ => {}
            }
        }
        params
    }

    /// Read callback parameters from a redirected URL.
    ///
    /// Fragment values take precedence; the query fills in whatever the
    /// fragment did not carry.
    pub fn from_url(url: &Url) -> Self {
        let fragment = Self::from_pairs(url.fragment().unwrap_or_default());
        let query = Self::from_pairs(url.query().unwrap_or_default());
        Self {
            access_token: fragment.access_token.or(query.access_token),
            state: fragment.state.or(query.state),
            error: fragment.error.or(query.error),
            error_description: fragment.error_description.or(query.error_description),
            scope: fragment.scope.or(query.scope),
            token_type: fragment.token_type.or(query.token_type),
        }
    }

    /// Parse whatever the user pasted: a full URL, `#fragment` or `?query`
    pub fn parse_input(input: &str) -> Self {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) => Self::from_url(&url),
            Err(_) => Self::from_pairs(input.trim_start_matches(['#', '?'])),
        }
    }

    /// The scopes granted by the provider, if reported
    pub fn granted_scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Terminal result of a redirect attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum RedirectOutcome {
    /// The provider redirected back; params may still carry an `error`
    Success(CallbackParams),
    /// The user cancelled the login
    Cancel,
    /// The browser was closed before a redirect happened
    Dismiss,
    /// The broker itself reported an error
    Error { message: String },
}

/// Opens an authorization URL and waits for the provider redirect
#[async_trait]
pub trait RedirectBroker: Send + Sync {
    /// Redirect URI registered with the provider for this broker
    fn redirect_uri(&self) -> String;

    /// Present `auth_url` to the user and resolve with the callback
    async fn authorize(&self, auth_url: &Url) -> Result<RedirectOutcome>;
}

/// Broker for terminals: prints the URL and reads the redirected URL back.
///
/// An empty line cancels, end of input dismisses.
pub struct ConsoleRedirectBroker<R, W> {
    redirect_uri: String,
    reader: Mutex<R>,
    writer: Mutex<W>,
}

impl<R, W> ConsoleRedirectBroker<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a broker reading callbacks from `reader` and prompting on `writer`
    pub fn new(redirect_uri: impl Into<String>, reader: R, writer: W) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Read one line from the console input, `None` at end of input.
    ///
    /// Shares the buffered reader used for callbacks, so input typed ahead
    /// of a later prompt is not lost.
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .lock()
            .await
            .read_line(&mut line)
            .await
            .context("Failed to read console input")?;
        Ok((read > 0).then_some(line))
    }
}

impl ConsoleRedirectBroker<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Broker over the process stdin/stdout
    pub fn stdio(redirect_uri: impl Into<String>) -> Self {
        Self::new(
            redirect_uri,
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }
}

#[async_trait]
impl<R, W> RedirectBroker for ConsoleRedirectBroker<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    async fn authorize(&self, auth_url: &Url) -> Result<RedirectOutcome> {
        {
            let mut writer = self.writer.lock().await;
            let prompt = format!(
                "Open this URL in a browser and sign in:\n\n  {}\n\n\
                 Paste the URL you were redirected to (empty line to cancel):\n",
                auth_url
            );
            writer
                .write_all(prompt.as_bytes())
                .await
                .context("Failed to write authorization prompt")?;
            writer.flush().await.context("Failed to flush authorization prompt")?;
        }
        info!("Waiting for authorization redirect");

        let Some(line) = self.read_line().await? else {
            debug!("Redirect input closed before a callback was received");
            return Ok(RedirectOutcome::Dismiss);
        };
        if line.trim().is_empty() {
            debug!("Login cancelled from console");
            return Ok(RedirectOutcome::Cancel);
        }

        Ok(RedirectOutcome::Success(CallbackParams::parse_input(&line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_fragment() {
        let url = Url::parse(
            "http://localhost:3000/#access_token=abc&scope=openid+user%3Aread%3Aemail&state=N&token_type=bearer",
        )
        .unwrap();
        let params = CallbackParams::from_url(&url);
        assert_eq!(params.access_token.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("N"));
        assert_eq!(params.token_type.as_deref(), Some("bearer"));
        assert_eq!(params.granted_scopes(), ["openid", "user:read:email"]);
        assert!(params.error.is_none());
    }

    #[test]
    fn test_params_from_error_query() {
        let url = Url::parse(
            "http://localhost:3000/?error=access_denied&error_description=The+user+denied+you+access&state=N",
        )
        .unwrap();
        let params = CallbackParams::from_url(&url);
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(
            params.error_description.as_deref(),
            Some("The user denied you access")
        );
        assert_eq!(params.state.as_deref(), Some("N"));
        assert!(params.access_token.is_none());
    }

    #[test]
    fn test_parse_raw_fragment_input() {
        let params = CallbackParams::parse_input("  #access_token=abc&state=N\n");
        assert_eq!(params.access_token.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("N"));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = RedirectOutcome::Success(CallbackParams {
            access_token: Some("abc".to_string()),
            state: Some("N".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "success");
        assert_eq!(json["params"]["access_token"], "abc");

        let cancel: RedirectOutcome = serde_json::from_str(r#"{"type":"cancel"}"#).unwrap();
        assert_eq!(cancel, RedirectOutcome::Cancel);
    }

    #[tokio::test]
    async fn test_console_broker_reads_callback() -> Result<()> {
        let input: &[u8] = b"http://localhost:3000/#access_token=abc&state=N\n";
        let broker = ConsoleRedirectBroker::new("http://localhost:3000", input, Vec::new());
        let url = Url::parse("https://id.twitch.tv/oauth2/authorize?state=N")?;

        let outcome = broker.authorize(&url).await?;
        match outcome {
            RedirectOutcome::Success(params) => {
                assert_eq!(params.access_token.as_deref(), Some("abc"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let written = broker.writer.lock().await.clone();
        let written = String::from_utf8(written)?;
        assert!(written.contains("https://id.twitch.tv/oauth2/authorize?state=N"));
        Ok(())
    }

    #[tokio::test]
    async fn test_console_broker_cancel_and_dismiss() -> Result<()> {
        let url = Url::parse("https://id.twitch.tv/oauth2/authorize")?;

        let cancel = ConsoleRedirectBroker::new("http://localhost:3000", &b"\n"[..], Vec::new());
        assert_eq!(cancel.authorize(&url).await?, RedirectOutcome::Cancel);

        let dismiss = ConsoleRedirectBroker::new("http://localhost:3000", &b""[..], Vec::new());
        assert_eq!(dismiss.authorize(&url).await?, RedirectOutcome::Dismiss);
        Ok(())
    }

    #[tokio::test]
    async fn test_console_broker_keeps_input_after_callback() -> Result<()> {
        let input: &[u8] = b"http://localhost:3000/#access_token=abc&state=N\n\n";
        let broker = ConsoleRedirectBroker::new("http://localhost:3000", input, Vec::new());
        let url = Url::parse("https://id.twitch.tv/oauth2/authorize?state=N")?;

        assert!(matches!(
            broker.authorize(&url).await?,
            RedirectOutcome::Success(_)
        ));
        assert_eq!(broker.read_line().await?.as_deref(), Some("\n"));
        assert_eq!(broker.read_line().await?, None);
        Ok(())
    }
}
