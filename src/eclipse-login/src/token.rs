//! Authorization code exchange against the token endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::AppConfig;

/// Response of `POST {domain}/oauth/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Why the token endpoint did not hand out a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenExchangeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{status} - {body}")]
    Rejected { status: u16, body: String },
}

/// Exchange an authorization code for an access token.
///
/// The body is form-encoded: `grant_type`, `client_id`, `code_verifier`,
/// `code` and `redirect_uri`.
pub async fn request_user_token(
    client: &Client,
    verifier: &str,
    code: &str,
    config: &AppConfig,
) -> Result<TokenResponse, TokenExchangeError> {
    let token_url = format!("{}/oauth/token", config.issuer());
    tracing::debug!(url = %token_url, "Requesting user token");

    let response = client
        .post(&token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", config.auth_client_id.as_str()),
            ("code_verifier", verifier),
            ("code", code),
            ("redirect_uri", config.auth_callback_url.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "Token endpoint rejected the code");
        return Err(TokenExchangeError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    tracing::debug!(expires_in = ?token.expires_in, "Received user token");
    Ok(token)
}
