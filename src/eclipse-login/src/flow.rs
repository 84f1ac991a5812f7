//! Authorization Code + PKCE login flow.
//!
//! ```text
//! IDLE -> CHALLENGE_CREATED -> SERVER_LISTENING -> BROWSER_OPENED
//!      -> CALLBACK_RECEIVED -> TOKEN_EXCHANGED -> SESSION_PERSISTED
//!                           \-> CALLBACK_ERROR
//! ```
//!
//! The verifier is generated once per [`LoginFlow`] and reused for the
//! challenge and the token exchange. Each attempt gets a fresh `state`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eclipse_keyring_store::CredentialStore;
use reqwest::Client;

use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::constants::OAUTH_SCOPE;
use crate::error::LoginError;
use crate::notify::Notifier;
use crate::pkce::{CHALLENGE_METHOD, PkceChallenge};
use crate::server::{OAuthState, create_auth_server};
use crate::storage::{AppConfigStore, SessionStore};
use crate::token::request_user_token;
use crate::types::{AppConfig, Session, now_millis};

pub const LOGIN_SUCCESS_MESSAGE: &str = "You've been logged in successfully!";
pub const LOGOUT_SUCCESS_MESSAGE: &str = "You've been logged out successfully.";
pub const CONFIG_MISSING_MESSAGE: &str =
    "Core config missing. Run `eclipse init` to configure the CLI.";

/// Build the `/authorize` URL the browser is sent to.
pub fn construct_auth_url(challenge: &str, state: &OAuthState, config: &AppConfig) -> String {
    format!(
        "{}/authorize?response_type=code&code_challenge_method={}&code_challenge={}&client_id={}&redirect_uri={}&scope={}&audience={}&state={}",
        config.issuer(),
        CHALLENGE_METHOD,
        urlencoding::encode(challenge),
        urlencoding::encode(&config.auth_client_id),
        urlencoding::encode(&config.auth_callback_url),
        urlencoding::encode(OAUTH_SCOPE),
        urlencoding::encode(&config.auth_target_audience),
        urlencoding::encode(state.as_str()),
    )
}

/// Knobs for a login attempt.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Give up waiting for the callback after this long. `None` waits until
    /// the process is interrupted.
    pub timeout: Option<Duration>,
    /// Launch the browser; when false the URL is only printed.
    pub open_browser: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            open_browser: true,
        }
    }
}

/// Something that can obtain a fresh session interactively.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run a login attempt. `None` means it failed and the user was told why.
    async fn authenticate(&self) -> Option<Session>;
}

/// The browser-based login flow.
pub struct LoginFlow {
    pkce: PkceChallenge,
    configs: AppConfigStore,
    sessions: SessionStore,
    client: Client,
    browser: Arc<dyn BrowserLauncher>,
    notifier: Arc<dyn Notifier>,
    options: LoginOptions,
}

impl LoginFlow {
    /// Create a flow backed by `store`, using the system browser and the
    /// default HTTP client.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, LoginError> {
        let client = eclipse_common::create_default_client().map_err(LoginError::HttpClient)?;
        Ok(Self {
            pkce: PkceChallenge::new(),
            configs: AppConfigStore::new(store.clone()),
            sessions: SessionStore::new(store),
            client,
            browser: Arc::new(SystemBrowser),
            notifier,
            options: LoginOptions::default(),
        })
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_options(mut self, options: LoginOptions) -> Self {
        self.options = options;
        self
    }

    /// The S256 challenge sent with every attempt of this flow.
    pub fn code_challenge(&self) -> &str {
        &self.pkce.challenge
    }

    /// Run one attempt and return the persisted session.
    pub async fn login(&self) -> Result<Session, LoginError> {
        let config = self.configs.require()?;
        config.validate()?;

        let state = OAuthState::new();
        let server = create_auth_server(&config, state.clone()).await?;
        let auth_url = construct_auth_url(&self.pkce.challenge, &state, &config);

        self.open_auth_page(&auth_url);

        let code = server.wait(self.options.timeout).await?;
        tracing::debug!("Received authorization code, exchanging for token");

        let token =
            request_user_token(&self.client, &self.pkce.verifier, code.as_str(), &config).await?;
        let session = Session::from_token(&token, now_millis());
        self.sessions.save(&session)?;

        tracing::info!(expires_at = ?session.expires_at(), "Login succeeded");
        Ok(session)
    }

    fn open_auth_page(&self, auth_url: &str) {
        if !self.options.open_browser {
            self.notifier
                .message(&format!("Open this URL to log in:\n{auth_url}"));
            return;
        }

        self.notifier.message("Opening your browser to log in...");
        if let Err(e) = self.browser.open(auth_url) {
            tracing::warn!(error = %e, "Failed to open browser");
            self.notifier.warning(&format!(
                "Could not open a browser ({e}). Open this URL manually:\n{auth_url}"
            ));
        }
    }

    /// Run the flow, reporting the outcome to the user. True on success.
    pub async fn initialize_auth_flow(&self) -> bool {
        self.authenticate().await.is_some()
    }

    /// Delete the cached session. Returns whether one existed.
    pub fn logout(&self) -> Result<bool, LoginError> {
        let deleted = self.sessions.delete()?;
        tracing::info!(deleted, "Logged out");
        self.notifier.success(LOGOUT_SUCCESS_MESSAGE);
        Ok(deleted)
    }

    fn report_failure(&self, err: &LoginError) {
        tracing::error!(error = %err, "Login failed");
        let text = match err {
            LoginError::ConfigMissing => CONFIG_MISSING_MESSAGE.to_string(),
            LoginError::ServerBind { port, .. } => {
                format!("Unable to start an HTTP server on port {port}.")
            }
            other => format!("Login failed: {other}"),
        };
        self.notifier.error(&text);
    }
}

#[async_trait]
impl Authenticator for LoginFlow {
    async fn authenticate(&self) -> Option<Session> {
        match self.login().await {
            Ok(session) => {
                self.notifier.success(LOGIN_SUCCESS_MESSAGE);
                Some(session)
            }
            Err(err) => {
                self.report_failure(&err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Level, RecordingNotifier};
    use eclipse_keyring_store::MemoryStore;

    fn config() -> AppConfig {
        AppConfig {
            auth_domain: "tenant.auth.test".to_string(),
            auth_client_id: "client id".to_string(),
            auth_callback_url: "http://localhost:4242/callback".to_string(),
            auth_server_port: 4242,
            auth_target_audience: "https://api.eclipse.test".to_string(),
            api_url: None,
            first_run: false,
        }
    }

    #[test]
    fn test_construct_auth_url() {
        let state = OAuthState::from("st");
        let url = construct_auth_url("chal", &state, &config());
        assert_eq!(
            url,
            "https://tenant.auth.test/authorize?response_type=code&code_challenge_method=S256\
             &code_challenge=chal&client_id=client%20id\
             &redirect_uri=http%3A%2F%2Flocalhost%3A4242%2Fcallback&scope=email\
             &audience=https%3A%2F%2Fapi.eclipse.test&state=st"
        );
    }

    #[test]
    fn test_challenge_fixed_per_flow() {
        let store = Arc::new(MemoryStore::new());
        let flow = LoginFlow::new(store, Arc::new(RecordingNotifier::new())).unwrap();
        assert_eq!(flow.code_challenge(), flow.code_challenge());
        assert_eq!(flow.code_challenge().len(), 43);
    }

    #[tokio::test]
    async fn test_missing_config_reports_and_fails() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let flow = LoginFlow::new(store, notifier.clone()).unwrap();

        assert!(!flow.initialize_auth_flow().await);
        assert!(notifier.contains(Level::Error, "Core config missing"));
    }

    #[tokio::test]
    async fn test_logout_confirms_even_without_session() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let flow = LoginFlow::new(store, notifier.clone()).unwrap();

        assert!(!flow.logout().unwrap());
        assert!(notifier.contains(Level::Success, LOGOUT_SUCCESS_MESSAGE));
    }
}
