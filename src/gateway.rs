//!
//! Authenticated gateway
//! ---------------------
//! The single path from the rest of the client to the recipe service for
//! calls that need a credential.
//!
//! Responsibilities:
//! - Refuse to send anything while signed out.
//! - Attach the bearer header from the `SessionStore`.
//! - Classify the reply: 401 clears the session for every caller at once,
//!   other failures become `ClientError::Request`, an empty success body is
//!   `None`.
//!
//! Each call is one-shot: no retry, no caching, no client-side timeout.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::join_url;
use crate::error::{ClientError, ClientResult};
use crate::identity::SessionStore;

#[derive(Clone)]
pub struct AuthenticatedGateway {
    session: Arc<SessionStore>,
    http: reqwest::Client,
    base_url: String,
}

impl AuthenticatedGateway {
    pub fn new<S: Into<String>>(session: Arc<SessionStore>, http: reqwest::Client, base_url: S) -> Self {
        Self { session, http, base_url: base_url.into() }
    }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    pub fn base_url(&self) -> &str { &self.base_url }

    /// Issue one authorized call and return the parsed body, `None` for an empty one.
    pub async fn request(&self, path: &str, method: Method, body: Option<&Value>) -> ClientResult<Option<Value>> {
        // token and headers come from one snapshot so a 401 expires the credential actually sent
        let Some((token, headers)) = self.session.authorization() else {
            debug!(target: "recipebox::gateway", %method, path, "refused: not authenticated");
            return Err(ClientError::AuthenticationRequired);
        };

        let url = join_url(&self.base_url, path);
        let mut req = self.http.request(method.clone(), &url).headers(headers);
        if let Some(b) = body {
            if method == Method::POST || method == Method::PUT {
                req = req.body(b.to_string());
            }
        }

        let resp = req.send().await.map_err(|e| {
            warn!(target: "recipebox::gateway", %method, path, error = %e, "transport failure");
            ClientError::request(None, e.to_string())
        })?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!(target: "recipebox::gateway", %method, path, "401 from service; clearing session");
            self.session.expire(&token);
            return Err(ClientError::SessionExpired);
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ClientError::request(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            debug!(target: "recipebox::gateway", %method, path, status = status.as_u16(), "request failed");
            let message = if text.trim().is_empty() {
                format!("Request failed with status {}", status.as_u16())
            } else {
                text
            };
            return Err(ClientError::request(Some(status.as_u16()), message));
        }

        debug!(target: "recipebox::gateway", %method, path, status = status.as_u16(), bytes = text.len(), "ok");
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ClientError::request(Some(status.as_u16()), format!("malformed response from {}: {}", path, e)))
    }

    pub async fn get(&self, path: &str) -> ClientResult<Option<Value>> {
        self.request(path, Method::GET, None).await
    }

    /// GET and decode into `T`; an empty body is a malformed response here.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let value = self.get(path).await?;
        decode_body(path, value)
    }

    /// POST/PUT `body` and decode the reply into `T`.
    pub async fn send_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, method: Method, body: &B) -> ClientResult<T> {
        let payload = serde_json::to_value(body).map_err(|e| ClientError::validation(e.to_string()))?;
        let value = self.request(path, method, Some(&payload)).await?;
        decode_body(path, value)
    }
}

fn decode_body<T: DeserializeOwned>(path: &str, value: Option<Value>) -> ClientResult<T> {
    let Some(v) = value else {
        return Err(ClientError::request(None, format!("empty response from {}", path)));
    };
    serde_json::from_value(v).map_err(|e| ClientError::request(None, format!("unexpected response shape from {}: {}", path, e)))
}
