use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::auth::token::SessionStatus;

/// Error codes for programmatic handling by presentation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Callback errors
    CallbackDenied,
    LoginCancelled,
    StateMismatch,
    MissingAccessToken,
    RedirectFailed,

    // Directory errors
    ProfileFetchFailed,
    MalformedProfile,

    // Transport errors
    NetworkError,

    // Session errors
    SessionBusy,

    // Configuration errors
    ConfigInvalid,
}

/// Error categories used to decide whether a retry makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The user declined or dismissed the login
    UserAction,
    /// The callback could not be trusted
    Security,
    /// The provider answered with something unexpected
    Provider,
    /// Transport failures, timeouts
    Network,
    /// Another operation is running
    Conflict,
    /// Not retryable without reconfiguration
    Configuration,
}

impl ErrorCategory {
    /// Returns true if trying the same operation again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UserAction | Self::Network | Self::Conflict | Self::Provider => true,
            Self::Security | Self::Configuration => false,
        }
    }
}

/// Errors surfaced by [`crate::AuthSession`] operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization was denied: {error}")]
    CallbackDenied {
        error: String,
        description: Option<String>,
    },

    #[error("Login was cancelled by the user")]
    Cancelled,

    #[error("Callback state did not match the state sent with the authorization request")]
    StateMismatch,

    #[error("Callback did not include an access token")]
    MissingAccessToken,

    #[error("Redirect broker failed: {reason}")]
    Redirect { reason: String },

    #[error("Profile lookup failed with HTTP {status}")]
    ProfileFetchFailed { status: u16 },

    #[error("Profile response could not be read: {reason}")]
    MalformedProfile { reason: String },

    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Session is busy ({status})")]
    Busy { status: SessionStatus },

    #[error("Invalid configuration value for '{key}': {reason}")]
    Config { key: String, reason: String },
}

impl AuthError {
    /// Get the stable error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CallbackDenied { .. } => ErrorCode::CallbackDenied,
            Self::Cancelled => ErrorCode::LoginCancelled,
            Self::StateMismatch => ErrorCode::StateMismatch,
            Self::MissingAccessToken => ErrorCode::MissingAccessToken,
            Self::Redirect { .. } => ErrorCode::RedirectFailed,
            Self::ProfileFetchFailed { .. } => ErrorCode::ProfileFetchFailed,
            Self::MalformedProfile { .. } => ErrorCode::MalformedProfile,
            Self::Network { .. } => ErrorCode::NetworkError,
            Self::Busy { .. } => ErrorCode::SessionBusy,
            Self::Config { .. } => ErrorCode::ConfigInvalid,
        }
    }

    /// Get the category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CallbackDenied { .. } | Self::Cancelled => ErrorCategory::UserAction,
            Self::StateMismatch | Self::MissingAccessToken => ErrorCategory::Security,
            Self::ProfileFetchFailed { .. } | Self::MalformedProfile { .. } => {
                ErrorCategory::Provider
            }
            Self::Network { .. } | Self::Redirect { .. } => ErrorCategory::Network,
            Self::Busy { .. } => ErrorCategory::Conflict,
            Self::Config { .. } => ErrorCategory::Configuration,
        }
    }

    /// Wrap a transport level failure
    pub fn network(err: impl fmt::Display) -> Self {
        Self::Network {
            reason: err.to_string(),
        }
    }

    /// Build a configuration error for the given key
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::CallbackDenied => write!(f, "CALLBACK_DENIED"),
            ErrorCode::LoginCancelled => write!(f, "LOGIN_CANCELLED"),
            ErrorCode::StateMismatch => write!(f, "STATE_MISMATCH"),
            ErrorCode::MissingAccessToken => write!(f, "MISSING_ACCESS_TOKEN"),
            ErrorCode::RedirectFailed => write!(f, "REDIRECT_FAILED"),
            ErrorCode::ProfileFetchFailed => write!(f, "PROFILE_FETCH_FAILED"),
            ErrorCode::MalformedProfile => write!(f, "MALFORMED_PROFILE"),
            ErrorCode::NetworkError => write!(f, "NETWORK_ERROR"),
            ErrorCode::SessionBusy => write!(f, "SESSION_BUSY"),
            ErrorCode::ConfigInvalid => write!(f, "CONFIG_INVALID"),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::UserAction => write!(f, "UserAction"),
            ErrorCategory::Security => write!(f, "Security"),
            ErrorCategory::Provider => write!(f, "Provider"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Conflict => write!(f, "Conflict"),
            ErrorCategory::Configuration => write!(f, "Configuration"),
        }
    }
}

/// Result type for session operations
pub type AuthResult<T> = Result<T, AuthError>;
