//! Local HTTP server receiving the OAuth redirect.
//!
//! The server listens on `127.0.0.1:{auth_server_port}`, and on `[::1]` at the
//! same port when IPv6 loopback is available, so a `localhost` redirect works
//! whichever address the browser resolves first. It serves the path of the
//! configured callback URL. The first callback carrying either an
//! authorization code or a provider error resolves a single-slot channel;
//! after that the server shuts down gracefully and later requests get an
//! "already completed" page.
//!
//! SECURITY FEATURES:
//! - Per-attempt random `state`, compared in constant time
//! - Provider error fields are HTML-escaped before rendering
//! - Loopback-only bind

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use eclipse_common::escape_html;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::LoginError;
use crate::pkce::{base64_url_encode, random_bytes};
use crate::types::AppConfig;

/// OAuth `state` value generated for one login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthState(String);

impl OAuthState {
    /// 32 random bytes, base64url-encoded.
    pub fn new() -> Self {
        Self(base64_url_encode(random_bytes::<32>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against the value echoed by the provider.
    pub fn matches(&self, received: &str) -> bool {
        constant_time_compare(&self.0, received)
    }
}

impl Default for OAuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for OAuthState {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Debug for OAuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OAuthState(***)")
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Authorization code received on the callback.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthorizationCode(***)")
    }
}

/// What a single callback request amounts to.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Valid code with a matching state.
    Code(AuthorizationCode),
    /// Provider error or state mismatch. Ends the attempt.
    Failed(LoginError),
    /// Neither `code` nor `error`; the server keeps listening.
    Incomplete,
}

/// Decide what a callback's query parameters mean.
pub fn classify_callback(
    params: &HashMap<String, String>,
    expected_state: &OAuthState,
) -> CallbackOutcome {
    if let Some(error) = params.get("error") {
        return CallbackOutcome::Failed(LoginError::Provider {
            error: error.clone(),
            description: params
                .get("error_description")
                .cloned()
                .unwrap_or_default(),
        });
    }

    match (params.get("code"), params.get("state")) {
        (Some(code), Some(state)) => {
            if expected_state.matches(state) {
                CallbackOutcome::Code(AuthorizationCode::new(code.as_str()))
            } else {
                CallbackOutcome::Failed(LoginError::StateMismatch)
            }
        }
        // A code without its state cannot be trusted
        (Some(_), None) => CallbackOutcome::Failed(LoginError::StateMismatch),
        _ => CallbackOutcome::Incomplete,
    }
}

const PAGE_TITLE: &str = "Eclipse CLI";

fn page(title: &str, heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{heading}</h1>\n{body}\n</body>\n</html>\n"
    )
}

pub fn success_page() -> String {
    page(
        PAGE_TITLE,
        "Authentication complete!",
        "<p>You can close this window and return to the terminal.</p>\n\
         <script>window.close();</script>",
    )
}

/// Failure page for a provider error. Both fields are escaped.
pub fn failure_page(error: &str, description: &str) -> String {
    page(
        &format!("{PAGE_TITLE} - Error"),
        "Authentication Failed",
        &format!(
            "<p><strong>{}</strong></p>\n<p>{}</p>\n\
             <p>Please check the terminal for details and try again.</p>",
            escape_html(error),
            escape_html(description)
        ),
    )
}

pub fn already_completed_page() -> String {
    page(
        PAGE_TITLE,
        "Authentication already completed",
        "<p>This login attempt has finished. You can close this window.</p>",
    )
}

fn failure_page_for(err: &LoginError) -> String {
    match err {
        LoginError::Provider { error, description } => failure_page(error, description),
        LoginError::StateMismatch => failure_page(
            "state_mismatch",
            "The response did not come from the login request this CLI started.",
        ),
        other => failure_page("login_failed", &other.to_string()),
    }
}

type CallbackResult = Result<AuthorizationCode, LoginError>;

struct CallbackState {
    expected_state: OAuthState,
    slot: Mutex<Option<oneshot::Sender<CallbackResult>>>,
    shutdown: watch::Sender<bool>,
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mut slot = state.slot.lock().await;
    let Some(sender) = slot.take() else {
        tracing::debug!("Ignoring callback after completion");
        return (StatusCode::OK, Html(already_completed_page()));
    };

    let (status, body, result) = match classify_callback(&params, &state.expected_state) {
        CallbackOutcome::Code(code) => {
            tracing::debug!("OAuth state validation passed");
            (StatusCode::OK, success_page(), Ok(code))
        }
        CallbackOutcome::Failed(err) => {
            tracing::warn!(error = %err, "OAuth callback failed");
            (StatusCode::BAD_REQUEST, failure_page_for(&err), Err(err))
        }
        CallbackOutcome::Incomplete => {
            *slot = Some(sender);
            tracing::debug!("Callback without code or error, still waiting");
            return (
                StatusCode::BAD_REQUEST,
                Html(failure_page(
                    "missing_parameters",
                    "The callback carried neither a code nor an error.",
                )),
            );
        }
    };

    let _ = sender.send(result);
    state.shutdown.send_replace(true);
    (status, Html(body))
}

/// Start the callback server for one login attempt.
pub async fn create_auth_server(
    config: &AppConfig,
    expected_state: OAuthState,
) -> Result<CallbackServer, LoginError> {
    CallbackServer::bind(config, expected_state).await
}

/// Running callback server for one login attempt.
pub struct CallbackServer {
    local_addr: SocketAddr,
    result_rx: oneshot::Receiver<CallbackResult>,
    handles: Vec<JoinHandle<std::io::Result<()>>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:{auth_server_port}` (plus `[::1]` when available) and
    /// start serving the callback path.
    pub async fn bind(config: &AppConfig, expected_state: OAuthState) -> Result<Self, LoginError> {
        let port = config.auth_server_port;
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| LoginError::ServerBind { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| LoginError::ServerBind { port, source })?;

        let mut listeners = vec![listener];
        match TcpListener::bind(("::1", local_addr.port())).await {
            Ok(v6) => listeners.push(v6),
            Err(e) => tracing::debug!(error = %e, "IPv6 loopback unavailable, serving IPv4 only"),
        }

        let (tx, result_rx) = oneshot::channel();
        let (shutdown, _) = watch::channel(false);
        let state = Arc::new(CallbackState {
            expected_state,
            slot: Mutex::new(Some(tx)),
            shutdown,
        });

        let callback_path = config.callback_path();
        let app = Router::new()
            .route(&callback_path, get(handle_callback))
            .with_state(state.clone());

        let handles = listeners
            .into_iter()
            .map(|listener| {
                let mut stop = state.shutdown.subscribe();
                let app = app.clone();
                tokio::spawn(async move {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move {
                            let _ = stop.wait_for(|done| *done).await;
                        })
                        .await
                })
            })
            .collect();

        tracing::info!(addr = %local_addr, path = %callback_path, "Callback server listening");

        Ok(Self {
            local_addr,
            result_rx,
            handles,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the first meaningful callback, optionally bounded by `timeout`.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<AuthorizationCode, LoginError> {
        let Self {
            result_rx, handles, ..
        } = self;
        let abort_all = || handles.iter().for_each(JoinHandle::abort);

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, result_rx).await {
                Ok(received) => received,
                Err(_) => {
                    abort_all();
                    return Err(LoginError::Timeout(limit));
                }
            },
            None => result_rx.await,
        };

        match received {
            Ok(result) => result,
            Err(_) => {
                abort_all();
                Err(LoginError::ServerClosed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_state_is_random_and_urlsafe() {
        let a = OAuthState::new();
        let b = OAuthState::new();
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(a.as_str().len(), 43);
        assert!(!a.as_str().contains(['+', '/', '=']));
    }

    #[test]
    fn test_state_matches() {
        let state = OAuthState::from("expected");
        assert!(state.matches("expected"));
        assert!(!state.matches("expectee"));
        assert!(!state.matches("expected-longer"));
        assert!(!state.matches(""));
    }

    #[test]
    fn test_classify_code() {
        let state = OAuthState::from("s1");
        match classify_callback(&params(&[("code", "abc"), ("state", "s1")]), &state) {
            CallbackOutcome::Code(code) => assert_eq!(code.as_str(), "abc"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_state_mismatch() {
        let state = OAuthState::from("s1");
        assert!(matches!(
            classify_callback(&params(&[("code", "abc"), ("state", "s2")]), &state),
            CallbackOutcome::Failed(LoginError::StateMismatch)
        ));
        assert!(matches!(
            classify_callback(&params(&[("code", "abc")]), &state),
            CallbackOutcome::Failed(LoginError::StateMismatch)
        ));
    }

    #[test]
    fn test_classify_provider_error_wins() {
        let state = OAuthState::from("s1");
        let outcome = classify_callback(
            &params(&[
                ("error", "denied"),
                ("error_description", "user cancelled"),
                ("code", "abc"),
                ("state", "s1"),
            ]),
            &state,
        );
        match outcome {
            CallbackOutcome::Failed(LoginError::Provider { error, description }) => {
                assert_eq!(error, "denied");
                assert_eq!(description, "user cancelled");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_incomplete() {
        let state = OAuthState::from("s1");
        assert!(matches!(
            classify_callback(&params(&[("state", "s1")]), &state),
            CallbackOutcome::Incomplete
        ));
        assert!(matches!(
            classify_callback(&HashMap::new(), &state),
            CallbackOutcome::Incomplete
        ));
    }

    #[test]
    fn test_failure_page_escapes_fields() {
        let html = failure_page("<script>alert(1)</script>", "a & b");
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    fn loopback_config() -> AppConfig {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        AppConfig {
            auth_domain: "tenant.auth.test".to_string(),
            auth_client_id: "client".to_string(),
            auth_callback_url: format!("http://localhost:{port}/callback"),
            auth_server_port: port,
            auth_target_audience: "https://api.eclipse.test".to_string(),
            api_url: None,
            first_run: false,
        }
    }

    #[tokio::test]
    async fn test_callback_over_ipv6_loopback() {
        if std::net::TcpListener::bind("[::1]:0").is_err() {
            return;
        }
        let config = loopback_config();
        let state = OAuthState::new();
        let server = create_auth_server(&config, state.clone()).await.unwrap();

        let url = format!(
            "http://[::1]:{}/callback?code=abc&state={}",
            config.auth_server_port,
            state.as_str()
        );
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let code = server.wait(Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(code.as_str(), "abc");
    }

    #[tokio::test]
    async fn test_wait_times_out_with_subsecond_limit() {
        let config = loopback_config();
        let server = create_auth_server(&config, OAuthState::new()).await.unwrap();

        let err = server
            .wait(Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Timeout(limit) if limit == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "login timed out after 200ms");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        assert!(!format!("{:?}", OAuthState::from("secret-state")).contains("secret-state"));
        assert!(!format!("{:?}", AuthorizationCode::new("secret-code")).contains("secret-code"));
    }
}
