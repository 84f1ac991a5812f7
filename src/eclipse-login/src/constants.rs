//! Constants for the eclipse-login module.

pub use eclipse_keyring_store::{AUTH_ACCOUNT, CORE_ACCOUNT, ECLIPSE_SERVICE as KEYRING_SERVICE};

/// Scope requested from the authorization server.
pub const OAUTH_SCOPE: &str = "email";

/// Callback path used when the configured callback URL has none.
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// Port suggested by `eclipse init` for the local callback server.
pub const DEFAULT_AUTH_SERVER_PORT: u16 = 4242;

/// Token lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
