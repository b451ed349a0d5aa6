use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::claims::{decode_claims, derive_roles};
use super::storage::{SessionStorage, ROLES_KEY, TOKEN_KEY, USERNAME_KEY};
use crate::config::join_url;
use crate::error::{ClientError, ClientResult};

pub type SessionToken = String;

pub const LOGIN_PATH: &str = "/api/auth/login";
const EVENT_CAPACITY: usize = 16;

/// `Authorization` value for `token`. `None` for an empty token or one that
/// cannot travel in a header (non-visible-ASCII bytes).
fn bearer_value(token: &str) -> Option<HeaderValue> {
    if token.is_empty() {
        return None;
    }
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).ok()?;
    value.set_sensitive(true);
    Some(value)
}

/// Credential, identity and authorization set, always replaced together.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
    /// Advisory roles decoded from the token; UI gating only.
    pub roles: Vec<String>,
    /// Advisory `exp` claim, for display.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,
    /// The service rejected the credential; the UI should return to the login view.
    Expired,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

/// Owner of the current session and its persisted copy.
///
/// One instance is built at startup and shared by `Arc`. All mutation goes
/// through a single write lock so readers never see a half-replaced session.
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
    http: reqwest::Client,
    base_url: String,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new<S: Into<String>>(http: reqwest::Client, base_url: S, storage: Arc<dyn SessionStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { current: RwLock::new(None), storage, http, base_url: base_url.into(), events }
    }

    /// Load the persisted session, if any. No network call; the restored
    /// credential is trusted until the service rejects it.
    pub fn restore(&self) -> Option<Session> {
        let restored = match self.read_persisted() {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "recipebox::session", error = %e, "could not read persisted session; starting signed out");
                None
            }
        };
        match &restored {
            Some(s) => info!(target: "recipebox::session", user = %s.username, roles = ?s.roles, "session restored"),
            None => debug!(target: "recipebox::session", "no persisted session"),
        }
        *self.current.write() = restored.clone();
        restored
    }

    fn read_persisted(&self) -> ClientResult<Option<Session>> {
        let Some(token) = self.storage.get(TOKEN_KEY)?.filter(|t| bearer_value(t).is_some()) else {
            return Ok(None);
        };
        let claims = decode_claims(&token);
        let username = self
            .storage
            .get(USERNAME_KEY)?
            .or_else(|| claims.as_ref().and_then(|c| c.sub.clone()))
            .unwrap_or_default();
        let roles = self
            .storage
            .get(ROLES_KEY)?
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| derive_roles(&token, &username));
        let expires_at = claims.and_then(|c| c.expires_at());
        Ok(Some(Session { token, username, roles, expires_at }))
    }

    fn write_persisted(&self, session: Option<&Session>) -> ClientResult<()> {
        match session {
            Some(s) => {
                let roles = serde_json::to_string(&s.roles).map_err(|e| ClientError::storage(e.to_string()))?;
                self.storage.set(TOKEN_KEY, &s.token)?;
                self.storage.set(USERNAME_KEY, &s.username)?;
                self.storage.set(ROLES_KEY, &roles)?;
            }
            None => {
                self.storage.remove(TOKEN_KEY)?;
                self.storage.remove(USERNAME_KEY)?;
                self.storage.remove(ROLES_KEY)?;
            }
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// Membership in the advisory role set; false when signed out.
    pub fn has_role(&self, role: &str) -> bool {
        self.current.read().as_ref().map(|s| s.has_role(role)).unwrap_or(false)
    }

    pub fn session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.username.clone())
    }

    pub fn roles(&self) -> Vec<String> {
        self.current.read().as_ref().map(|s| s.roles.clone()).unwrap_or_default()
    }

    /// Token and the headers built from it, taken under one read.
    pub(crate) fn authorization(&self) -> Option<(SessionToken, HeaderMap)> {
        let current = self.current.read();
        let token = current.as_ref()?.token.clone();
        drop(current);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer_value(&token)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Some((token, headers))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Exchange username and password for a bearer token.
    ///
    /// On success the new session replaces the old one in memory and on
    /// disk. On any failure the previous session is left as it was.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Session> {
        let url = join_url(&self.base_url, LOGIN_PATH);
        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| {
                warn!(target: "recipebox::session", user = %username, error = %e, "login transport failure");
                ClientError::authentication(format!("Login failed: {}", e))
            })?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            info!(target: "recipebox::session", user = %username, status = status.as_u16(), "login rejected");
            let message = if text.trim().is_empty() { "Login failed".to_string() } else { text };
            return Err(ClientError::authentication(message));
        }
        let token = serde_json::from_str::<LoginResponse>(&text)
            .ok()
            .and_then(|r| r.token)
            .filter(|t| bearer_value(t).is_some())
            .ok_or_else(|| {
                warn!(target: "recipebox::session", user = %username, "login reply carried no token");
                ClientError::authentication("Login failed: malformed response")
            })?;

        let roles = derive_roles(&token, username);
        let expires_at = decode_claims(&token).and_then(|c| c.expires_at());
        let session = Session { token, username: username.to_string(), roles, expires_at };

        {
            let mut current = self.current.write();
            if let Err(e) = self.write_persisted(Some(&session)) {
                // put the previous triad back so disk and memory agree
                if let Err(rollback) = self.write_persisted(current.as_ref()) {
                    warn!(target: "recipebox::session", error = %rollback, "could not restore previous persisted session");
                }
                return Err(e);
            }
            *current = Some(session.clone());
        }
        info!(target: "recipebox::session", user = %session.username, roles = ?session.roles, "login succeeded");
        let _ = self.events.send(SessionEvent::LoggedIn { username: session.username.clone() });
        Ok(session)
    }

    /// Clear memory and disk. Never fails; calling it twice is harmless.
    pub fn logout(&self) {
        if self.clear().is_some() {
            info!(target: "recipebox::session", "logged out");
            let _ = self.events.send(SessionEvent::LoggedOut);
        }
    }

    /// Forced logout after the service answered 401 to a call made with `token`.
    ///
    /// A newer session (from a login that completed while the rejected call
    /// was in flight) is left alone. Returns whether a session was cleared.
    pub fn expire(&self, token: &str) -> bool {
        let cleared = {
            let mut current = self.current.write();
            if current.as_ref().map(|s| s.token.as_str()) != Some(token) {
                false
            } else {
                *current = None;
                if let Err(e) = self.write_persisted(None) {
                    warn!(target: "recipebox::session", error = %e, "could not erase persisted session");
                }
                true
            }
        };
        if cleared {
            info!(target: "recipebox::session", "session expired");
            let _ = self.events.send(SessionEvent::Expired);
        }
        cleared
    }

    fn clear(&self) -> Option<Session> {
        let mut current = self.current.write();
        let prev = current.take();
        if let Err(e) = self.write_persisted(None) {
            warn!(target: "recipebox::session", error = %e, "could not erase persisted session");
        }
        prev
    }

    /// Headers for an authorized call. `None` when signed out.
    pub fn authorization_header(&self) -> Option<HeaderMap> {
        self.authorization().map(|(_, headers)| headers)
    }
}
