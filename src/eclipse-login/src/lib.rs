//! Eclipse Login - browser authentication for the Eclipse CLI.
//!
//! Implements the OAuth2 Authorization Code flow with PKCE:
//! - S256 code challenge, verifier generated once per process
//! - Local callback server on the configured loopback port
//! - Per-attempt random `state` validated in constant time
//! - Session cached in the OS keychain with its expiry
//!
//! [`SessionGuard`] decides on each invocation whether the cached session can
//! be reused or the flow has to run again.

pub mod browser;
pub mod constants;
pub mod error;
pub mod flow;
pub mod guard;
pub mod notify;
pub mod pkce;
pub mod server;
pub mod storage;
pub mod token;
pub mod types;

pub use browser::{BrowserLauncher, SystemBrowser, open_auth_page};
pub use constants::{
    AUTH_ACCOUNT, CORE_ACCOUNT, DEFAULT_AUTH_SERVER_PORT, DEFAULT_CALLBACK_PATH, KEYRING_SERVICE,
};
pub use error::LoginError;
pub use flow::{
    Authenticator, LOGIN_SUCCESS_MESSAGE, LOGOUT_SUCCESS_MESSAGE, LoginFlow, LoginOptions,
    construct_auth_url,
};
pub use guard::{
    GuardOutcome, SESSION_EXPIRED_MESSAGE, SESSION_MISSING_MESSAGE, SESSION_RESTORED_MESSAGE,
    SessionGuard, SessionStatus,
};
pub use notify::{Notifier, RecordingNotifier};
pub use pkce::{PkceChallenge, base64_url_encode, create_code_challenge, create_code_verifier};
pub use server::{AuthorizationCode, CallbackServer, OAuthState, create_auth_server};
pub use storage::{AppConfigStore, SessionStore};
pub use token::{TokenExchangeError, TokenResponse, request_user_token};
pub use types::{AppConfig, Session, now_millis};
