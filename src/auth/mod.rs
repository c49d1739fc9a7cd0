pub mod authorize;
pub mod nonce;
pub mod providers;
pub mod redirect;
pub mod session;
pub mod token;

pub use authorize::AuthorizationRequest;
pub use providers::{HelixDirectoryClient, TokenRevoker, TwitchRevoker, UserDirectoryClient};
pub use redirect::{CallbackParams, ConsoleRedirectBroker, RedirectBroker, RedirectOutcome};
pub use session::AuthSession;
pub use token::{Credential, SessionSnapshot, SessionStatus, UserProfile};
