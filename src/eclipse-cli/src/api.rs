//! Client for the Eclipse REST API.
//!
//! Every endpoint answers with `{ payload, statusCode, message }`; a
//! `statusCode` other than 200 is an error even when the HTTP status is 2xx.

use eclipse_common::file_notation::lenient;
use eclipse_login::{AppConfig, DEFAULT_AUTH_SERVER_PORT, DEFAULT_CALLBACK_PATH};
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no API URL configured; pass --api-url or set ECLIPSE_API_URL")]
    MissingBaseUrl,

    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("{path} returned status {status_code}: {message}")]
    Envelope {
        path: String,
        status_code: u16,
        message: String,
    },

    #[error("unexpected response from {path}: {source}")]
    Payload {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Response wrapper used by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub payload: Option<T>,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub environment: String,
    #[serde(
        default,
        alias = "createdAt",
        deserialize_with = "lenient::optional_string"
    )]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedSecret {
    #[serde(flatten)]
    pub secret: Secret,
    #[serde(deserialize_with = "lenient::string")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "ownerId", alias = "owner")]
    pub owner_id: String,
    #[serde(
        default,
        rename = "createdAt",
        deserialize_with = "lenient::optional_string"
    )]
    pub created_at: Option<String>,
    #[serde(default)]
    pub secrets: Vec<Secret>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /secrets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretDto {
    pub project_id: String,
    pub owner_id: String,
    pub name: String,
    pub value: String,
    pub component: String,
    pub environment: String,
}

/// Query of `GET /secrets/reveal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretQuery {
    pub project_id: String,
    pub owner_id: String,
    pub component: String,
    pub environment: String,
}

impl SecretQuery {
    pub fn for_project(project: &Project, component: &str, environment: &str) -> Self {
        Self {
            project_id: project.id.clone(),
            owner_id: project.owner_id.clone(),
            component: component.to_string(),
            environment: environment.to_string(),
        }
    }
}

/// Auth settings served by `POST /cli`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliValues {
    #[serde(alias = "ECLIPSE_AUTH_DOMAIN", deserialize_with = "lenient::string")]
    pub auth_domain: String,
    #[serde(alias = "ECLIPSE_AUTH_CLIENT_ID", deserialize_with = "lenient::string")]
    pub auth_client_id: String,
    #[serde(
        alias = "ECLIPSE_AUTH_TARGET_AUDIENCE",
        deserialize_with = "lenient::string"
    )]
    pub auth_target_audience: String,
    #[serde(
        default,
        alias = "ECLIPSE_AUTH_CALLBACK_URL",
        deserialize_with = "lenient::optional_string"
    )]
    pub auth_callback_url: Option<String>,
    #[serde(
        default,
        alias = "ECLIPSE_AUTH_SERVER_PORT",
        deserialize_with = "lenient::optional_port"
    )]
    pub auth_server_port: Option<u16>,
}

impl CliValues {
    /// Fill in the local callback defaults and mark the config as fresh.
    pub fn into_app_config(self, api_url: Option<String>) -> AppConfig {
        let port = self.auth_server_port.unwrap_or(DEFAULT_AUTH_SERVER_PORT);
        let callback = self
            .auth_callback_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}{DEFAULT_CALLBACK_PATH}"));
        AppConfig {
            auth_domain: self.auth_domain,
            auth_client_id: self.auth_client_id,
            auth_callback_url: callback,
            auth_server_port: port,
            auth_target_audience: self.auth_target_audience,
            api_url,
            first_run: true,
        }
    }
}

/// Authenticated HTTP client for the Eclipse API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish()
    }
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, token: SecretString) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::MissingBaseUrl);
        }
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose_secret())
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Value, ApiError> {
        let response = builder.send().await.map_err(|source| ApiError::Http {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ApiError::Http {
            path: path.to_string(),
            source,
        })?;
        tracing::debug!(path, status = status.as_u16(), "API response");

        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else if status.is_success() {
            serde_json::from_str(&text).map_err(|source| ApiError::Payload {
                path: path.to_string(),
                source,
            })?
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| body.as_str().map(str::to_string))
                .unwrap_or_default();
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        unwrap_envelope(body, path)
    }

    async fn send_typed<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let payload = self.send(builder, path).await?;
        decode_payload(payload, path)
    }

    /// `POST /cli`: the auth settings for this CLI.
    pub async fn get_cli_values(&self) -> Result<CliValues, ApiError> {
        self.send_typed(self.request(Method::POST, "/cli"), "/cli")
            .await
    }

    /// `GET /users`: the logged-in user.
    pub async fn get_user(&self) -> Result<User, ApiError> {
        self.send_typed(self.request(Method::GET, "/users"), "/users")
            .await
    }

    /// `GET /projects`, optionally narrowed to one project.
    pub async fn get_projects(&self, project_id: Option<&str>) -> Result<Vec<Project>, ApiError> {
        let mut builder = self.request(Method::GET, "/projects");
        if let Some(id) = project_id {
            builder = builder.query(&[("projectId", id)]);
        }
        self.send_typed(builder, "/projects").await
    }

    /// `GET /secrets/reveal`: secrets with their values.
    pub async fn get_secrets(&self, query: &SecretQuery) -> Result<Vec<RevealedSecret>, ApiError> {
        let builder = self.request(Method::GET, "/secrets/reveal").query(query);
        self.send_typed(builder, "/secrets/reveal").await
    }

    /// `POST /secrets`.
    pub async fn create_secret(&self, dto: &CreateSecretDto) -> Result<Secret, ApiError> {
        let builder = self.request(Method::POST, "/secrets").json(dto);
        self.send_typed(builder, "/secrets").await
    }

    /// `DELETE /secrets/{id}`.
    pub async fn delete_secret(&self, secret_id: &str) -> Result<(), ApiError> {
        let path = format!("/secrets/{}", urlencoding::encode(secret_id));
        self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }
}

/// Strip the envelope when present. Bodies without `statusCode` are
/// returned as-is.
fn unwrap_envelope(body: Value, path: &str) -> Result<Value, ApiError> {
    let is_envelope = body
        .as_object()
        .is_some_and(|o| o.contains_key("statusCode"));
    if !is_envelope {
        return Ok(body);
    }

    let envelope: ApiEnvelope<Value> =
        serde_json::from_value(body).map_err(|source| ApiError::Payload {
            path: path.to_string(),
            source,
        })?;
    if envelope.status_code != 200 {
        return Err(ApiError::Envelope {
            path: path.to_string(),
            status_code: envelope.status_code,
            message: envelope.message,
        });
    }
    Ok(envelope.payload.unwrap_or(Value::Null))
}

/// Decode a payload, accepting JSON that arrives double-encoded as a string.
fn decode_payload<T: DeserializeOwned>(payload: Value, path: &str) -> Result<T, ApiError> {
    let payload = match payload {
        Value::String(text) if looks_like_json(&text) => {
            serde_json::from_str(&text).map_err(|source| ApiError::Payload {
                path: path.to_string(),
                source,
            })?
        }
        other => other,
    };
    serde_json::from_value(payload).map_err(|source| ApiError::Payload {
        path: path.to_string(),
        source,
    })
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('[') || trimmed.starts_with('{')
}
