pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod http_client;

#[cfg(test)]
mod tests;

// Re-export core components
pub use crate::auth::{
    AuthSession, CallbackParams, ConsoleRedirectBroker, Credential, RedirectBroker,
    RedirectOutcome, SessionSnapshot, SessionStatus, UserProfile,
};
pub use crate::config::AuthConfig;
pub use crate::error::{AuthError, AuthResult, ErrorCategory, ErrorCode};
pub use crate::events::{SessionEvent, SessionEvents};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
