//! Type definitions for persisted authentication data.

use chrono::{DateTime, TimeZone, Utc};
use eclipse_common::file_notation::lenient;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CALLBACK_PATH, DEFAULT_TOKEN_LIFETIME_SECS};
use crate::error::LoginError;
use crate::token::TokenResponse;

/// Cached login: the access token and its expiry in epoch milliseconds.
///
/// Stored as `access_token=...\nexpiration_date=...\n`; the field order here
/// is the order on disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(deserialize_with = "lenient::string")]
    pub access_token: String,
    pub expiration_date: i64,
}

impl Session {
    /// Build a session from a token response received at `now_ms`.
    pub fn from_token(token: &TokenResponse, now_ms: i64) -> Self {
        let lifetime_secs = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let lifetime_ms = i64::try_from(lifetime_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        Self {
            access_token: token.access_token.clone(),
            expiration_date: now_ms.saturating_add(lifetime_ms),
        }
    }

    /// Expired once `expiration_date <= now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expiration_date <= now_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expiration_date).single()
    }

    /// The token wrapped for in-memory handling.
    pub fn secret_token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("expiration_date", &self.expiration_date)
            .finish()
    }
}

/// Settings the login flow needs to talk to the authorization server.
///
/// Accepts the `ECLIPSE_AUTH_*` names used by the server's `/cli` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(alias = "ECLIPSE_AUTH_DOMAIN", deserialize_with = "lenient::string")]
    pub auth_domain: String,

    #[serde(alias = "ECLIPSE_AUTH_CLIENT_ID", deserialize_with = "lenient::string")]
    pub auth_client_id: String,

    #[serde(
        alias = "ECLIPSE_AUTH_CALLBACK_URL",
        deserialize_with = "lenient::string"
    )]
    pub auth_callback_url: String,

    #[serde(alias = "ECLIPSE_AUTH_SERVER_PORT", deserialize_with = "lenient::port")]
    pub auth_server_port: u16,

    #[serde(
        alias = "ECLIPSE_AUTH_TARGET_AUDIENCE",
        deserialize_with = "lenient::string"
    )]
    pub auth_target_audience: String,

    #[serde(
        default,
        alias = "ECLIPSE_API_URL",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub api_url: Option<String>,

    #[serde(default, alias = "FIRST_RUN")]
    pub first_run: bool,
}

impl AppConfig {
    /// The authorization server base URL without a trailing slash.
    ///
    /// Bare domains (`tenant.auth0.com`) are treated as HTTPS.
    pub fn issuer(&self) -> String {
        let domain = self.auth_domain.trim().trim_end_matches('/');
        if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    /// Path component of the callback URL, served by the local server.
    pub fn callback_path(&self) -> String {
        url::Url::parse(&self.auth_callback_url)
            .ok()
            .map(|u| u.path().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CALLBACK_PATH.to_string())
    }

    /// Reject configurations the login flow cannot work with.
    ///
    /// SECURITY: the authorization server must use HTTPS unless it is a
    /// loopback address.
    pub fn validate(&self) -> Result<(), LoginError> {
        let issuer = url::Url::parse(&self.issuer())
            .map_err(|e| LoginError::InvalidConfig(format!("auth domain: {e}")))?;
        let loopback = matches!(issuer.host_str(), Some("localhost" | "127.0.0.1"));
        match issuer.scheme() {
            "https" => {}
            "http" if loopback => {}
            scheme => {
                return Err(LoginError::InvalidConfig(format!(
                    "auth domain must use https, found {scheme}"
                )));
            }
        }
        if !issuer.username().is_empty() || issuer.password().is_some() {
            return Err(LoginError::InvalidConfig(
                "auth domain must not embed credentials".to_string(),
            ));
        }

        url::Url::parse(&self.auth_callback_url)
            .map_err(|e| LoginError::InvalidConfig(format!("callback url: {e}")))?;
        if self.auth_client_id.trim().is_empty() {
            return Err(LoginError::InvalidConfig("client id is empty".to_string()));
        }
        if self.auth_server_port == 0 {
            return Err(LoginError::InvalidConfig("server port is 0".to_string()));
        }
        Ok(())
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
