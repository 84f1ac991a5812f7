//! Session guard: restore a cached session or log in again.

use std::sync::Arc;

use secrecy::SecretString;

use crate::flow::Authenticator;
use crate::notify::Notifier;
use crate::storage::SessionStore;
use crate::types::{Session, now_millis};

pub const SESSION_RESTORED_MESSAGE: &str = "Session restored. Welcome back!";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, logging in again.";
pub const SESSION_MISSING_MESSAGE: &str = "No session found, logging in.";

/// Result of [`SessionGuard::ensure_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// A cached, unexpired session was found.
    Restored(Session),
    /// The login flow ran and produced a new session.
    LoggedIn(Session),
    /// The login flow ran and failed.
    Failed,
}

impl GuardOutcome {
    pub fn session(&self) -> Option<&Session> {
        match self {
            GuardOutcome::Restored(session) | GuardOutcome::LoggedIn(session) => Some(session),
            GuardOutcome::Failed => None,
        }
    }
}

/// Cached session state, as seen without logging in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Missing,
    Expired(Session),
    Valid(Session),
}

pub struct SessionGuard {
    sessions: SessionStore,
    authenticator: Arc<dyn Authenticator>,
    notifier: Arc<dyn Notifier>,
}

impl SessionGuard {
    pub fn new(
        sessions: SessionStore,
        authenticator: Arc<dyn Authenticator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sessions,
            authenticator,
            notifier,
        }
    }

    /// Classify the cached session at `now_ms`. Store and decode failures
    /// count as no session.
    pub fn inspect_at(&self, now_ms: i64) -> SessionStatus {
        let session = match self.sessions.load() {
            Ok(Some(session)) => session,
            Ok(None) => return SessionStatus::Missing,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read cached session");
                return SessionStatus::Missing;
            }
        };

        if session.is_expired_at(now_ms) {
            SessionStatus::Expired(session)
        } else {
            SessionStatus::Valid(session)
        }
    }

    pub fn inspect(&self) -> SessionStatus {
        self.inspect_at(now_millis())
    }

    /// Restore the cached session or run the login flow.
    pub async fn ensure_session(&self) -> GuardOutcome {
        match self.inspect() {
            SessionStatus::Valid(session) => {
                tracing::debug!("Restored cached session");
                self.notifier.success(SESSION_RESTORED_MESSAGE);
                return GuardOutcome::Restored(session);
            }
            SessionStatus::Expired(_) => {
                tracing::info!("Session expired, logging in");
                self.notifier.warning(SESSION_EXPIRED_MESSAGE);
            }
            SessionStatus::Missing => {
                tracing::info!("No session found, logging in");
                self.notifier.warning(SESSION_MISSING_MESSAGE);
            }
        }

        match self.authenticator.authenticate().await {
            Some(session) => GuardOutcome::LoggedIn(session),
            None => GuardOutcome::Failed,
        }
    }

    /// True only when the login flow ran and succeeded.
    pub async fn check_if_auth_flow_required(&self) -> bool {
        matches!(self.ensure_session().await, GuardOutcome::LoggedIn(_))
    }

    /// The cached session if it has not expired.
    pub fn current_session(&self) -> Option<Session> {
        match self.inspect() {
            SessionStatus::Valid(session) => Some(session),
            _ => None,
        }
    }

    pub fn access_token(&self) -> Option<SecretString> {
        self.current_session().map(|s| s.secret_token())
    }
}
