use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, error, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use twitch_session::{AuthConfig, AuthSession, ConsoleRedirectBroker};

/// Environment variable pointing at a JSON config file
const CONFIG_PATH_ENV: &str = "TWITCH_SESSION_CONFIG";

/// Config file from `--config <path>`, then `TWITCH_SESSION_CONFIG`
fn config_path(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>> {
    while let Some(arg) = args.next() {
        if arg == "--config" {
            match args.next() {
                Some(path) => return Ok(Some(PathBuf::from(path))),
                None => bail!("--config requires a path"),
            }
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Ok(Some(PathBuf::from(path)));
        }
    }
    Ok(std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from))
}

async fn load_configuration() -> Result<AuthConfig> {
    match config_path(std::env::args().skip(1))? {
        Some(path) => AuthConfig::load(&path).await,
        None => Ok(AuthConfig::from_env()?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                "twitch_session=debug,warn".into()
            } else {
                "twitch_session=info,warn".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(version = twitch_session::VERSION, "twitch-session starting");

    match env_file_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };

    let config = load_configuration().await?;
    let broker = Arc::new(ConsoleRedirectBroker::stdio(config.redirect_uri.clone()));
    let session = Arc::new(AuthSession::twitch(config, broker.clone())?);

    let user = match session.sign_in().await {
        Ok(user) => user,
        Err(e) => {
            let category = e.category();
            error!(
                code = %e.code(),
                category = ?category,
                retryable = category.is_retryable(),
                "Sign-in failed: {}",
                e
            );
            if category.is_retryable() {
                eprintln!("Sign-in did not complete; run again to retry.");
            }
            return Err(e.into());
        }
    };

    println!("Signed in as {} (id {})", user.display_name, user.id);
    if !user.email.is_empty() {
        println!("Email: {}", user.email);
    }
    println!("Avatar: {}", user.avatar_url);
    println!("\nPress Enter to sign out.");

    broker.read_line().await?;

    session.sign_out().await?;
    println!("Signed out.");
    Ok(())
}
