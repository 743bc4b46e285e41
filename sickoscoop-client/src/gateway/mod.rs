//! The single door to the REST backend.
//!
//! Every request carries the bearer token when one is known, is bounded by a
//! timeout, and fails with a [`GatewayError`] from a small taxonomy. Transport
//! failures flip the shared connectivity flag to disconnected; any HTTP
//! response flips it back to connected.

pub mod normalize;
pub mod remote;

use crate::{
    connectivity::ApiStatus,
    session::{context::SessionContext, storage::SessionPersistence},
};
use headers::{Authorization, HeaderMapExt};
use reqwest::{Method, StatusCode, header::HeaderMap};
use serde_json::{Map, Value};
use sickoscoop_common::model::auth::AuthToken;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const AUTH_ENDPOINT_PREFIX: &str = "/auth/";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("Network error while requesting {endpoint}: {source}")]
    Network {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("{message}")]
    Unauthorized { endpoint: String, message: String },
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("HTTP client could not be built: {0}")]
    Client(reqwest::Error),
}

impl GatewayError {
    /// A 401 from an authentication endpoint, i.e. rejected credentials or a
    /// rejected token. A 401 anywhere else is not a reason to end a session.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { endpoint, .. } if endpoint.starts_with(AUTH_ENDPOINT_PREFIX))
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout { .. } | GatewayError::Network { .. }
        )
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
        }
    }

    #[must_use]
    pub fn post_empty() -> Self {
        Self {
            method: Method::POST,
            body: None,
        }
    }
}

pub struct Gateway {
    client: reqwest::Client,
    config: GatewayConfig,
    session: Arc<SessionContext>,
    persistence: SessionPersistence,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        session: Arc<SessionContext>,
        persistence: SessionPersistence,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(GatewayError::Client)?;

        Ok(Self {
            client,
            config,
            session,
            persistence,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Override first, then the live session, then whatever was persisted.
    fn resolve_token(&self, token_override: Option<&AuthToken>) -> Option<AuthToken> {
        token_override
            .cloned()
            .or_else(|| self.session.token())
            .or_else(|| self.persistence.token())
            .filter(|token| !token.is_empty())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn call(
        &self,
        endpoint: &str,
        request: ApiRequest,
        token_override: Option<&AuthToken>,
    ) -> Result<Value, GatewayError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.resolve_token(token_override) {
            match Authorization::bearer(token.as_str()) {
                Ok(authorization) => headers.typed_insert(authorization),
                Err(_) => warn!(endpoint, "Token is not a valid bearer value, sending without"),
            }
        }

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(endpoint))
            .timeout(self.config.timeout)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, endpoint, "Sending request");

        let response = builder
            .send()
            .await
            .map_err(|err| self.transport_failure(endpoint, err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_failure(endpoint, err))?;

        self.session.connectivity().set(ApiStatus::Connected);

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| status_line(status));
            warn!(endpoint, %status, reason = %message, "Request failed");

            return Err(if status == StatusCode::UNAUTHORIZED {
                GatewayError::Unauthorized {
                    endpoint: endpoint.to_owned(),
                    message,
                }
            } else {
                GatewayError::Server {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    fn transport_failure(&self, endpoint: &str, err: reqwest::Error) -> GatewayError {
        self.session.connectivity().set(ApiStatus::Disconnected);

        if err.is_timeout() {
            warn!(endpoint, timeout = ?self.config.timeout, "Request timed out");
            GatewayError::Timeout {
                endpoint: endpoint.to_owned(),
            }
        } else {
            warn!(endpoint, error = %err, "Request failed before a response arrived");
            GatewayError::Network {
                endpoint: endpoint.to_owned(),
                source: err,
            }
        }
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    let Ok(Value::Object(object)) = serde_json::from_slice::<Value>(body) else {
        return None;
    };

    ["message", "error"]
        .into_iter()
        .filter_map(|key| object.get(key)?.as_str())
        .find(|message| !message.trim().is_empty())
        .map(str::to_owned)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use crate::gateway::{GatewayError, error_message, status_line};
    use reqwest::StatusCode;

    #[test]
    fn error_message_prefers_message_then_error() {
        assert_eq!(
            error_message(br#"{"message": "Invalid credentials", "error": "x"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            error_message(br#"{"error": "Post not found"}"#).as_deref(),
            Some("Post not found")
        );
        assert_eq!(error_message(br#"{"message": ""}"#), None);
        assert_eq!(error_message(b"<html>bad gateway</html>"), None);
        assert_eq!(error_message(b""), None);
    }

    #[test]
    fn status_line_fallback() {
        assert_eq!(
            status_line(StatusCode::SERVICE_UNAVAILABLE),
            "HTTP 503 Service Unavailable"
        );
    }

    #[test]
    fn auth_rejection_is_endpoint_specific() {
        let on_auth = GatewayError::Unauthorized {
            endpoint: "/auth/login".to_owned(),
            message: "nope".to_owned(),
        };
        let on_posts = GatewayError::Unauthorized {
            endpoint: "/posts".to_owned(),
            message: "nope".to_owned(),
        };

        assert!(on_auth.is_auth_rejection());
        assert!(!on_posts.is_auth_rejection());
        assert!(on_posts.is_unauthorized());
        assert!(!on_posts.is_transport());
    }
}
