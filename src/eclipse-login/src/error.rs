//! Errors raised by the login flow and session storage.

use eclipse_common::NotationError;
use eclipse_keyring_store::KeyringError;

use crate::token::TokenExchangeError;

/// Errors that can occur during the OAuth flow or while touching stored
/// credentials.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("core config missing, run `eclipse init` first")]
    ConfigMissing,

    #[error("invalid core config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] KeyringError),

    #[error("stored record is malformed: {0}")]
    Notation(#[from] NotationError),

    #[error("unable to start an HTTP server on port {port}: {source}")]
    ServerBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("callback server stopped before a callback arrived")]
    ServerClosed,

    #[error("OAuth error from provider: {error} - {description}")]
    Provider { error: String, description: String },

    #[error("CSRF attack detected: state parameter mismatch")]
    StateMismatch,

    #[error("error attempting to request user token: {source}")]
    TokenExchange {
        #[from]
        source: TokenExchangeError,
    },

    #[error("login timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
