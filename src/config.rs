//! Environment-driven client configuration.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Url;

use crate::error::{ClientError, ClientResult};
use crate::identity::{FileStorage, SessionStorage};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
const SESSION_DIR: &str = ".recipebox";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin (and optional path prefix) of the recipe service, no trailing slash.
    pub base_url: String,
    pub session_file: PathBuf,
    /// Render command output as JSON instead of tables.
    pub json_output: bool,
}

impl ClientConfig {
    pub fn new<S: AsRef<str>>(base_url: S, session_file: PathBuf) -> ClientResult<Self> {
        Ok(Self { base_url: normalize_base_url(base_url.as_ref())?, session_file, json_output: false })
    }

    /// Reads `RECIPEBOX_API_URL`, `RECIPEBOX_SESSION_FILE` and `RECIPEBOX_OUTPUT`.
    pub fn from_env() -> ClientResult<Self> {
        let base = std::env::var("RECIPEBOX_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let session_file = std::env::var("RECIPEBOX_SESSION_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_session_file);
        let json_output = std::env::var("RECIPEBOX_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
        let mut cfg = Self::new(base, session_file)?;
        cfg.json_output = json_output;
        Ok(cfg)
    }

    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        Arc::new(FileStorage::new(self.session_file.clone()))
    }

    pub fn http_client(&self) -> ClientResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!("recipebox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::request(None, format!("http client: {}", e)))
    }
}

/// `$HOME/.recipebox/session.json`, or relative to the working directory when no home is set.
pub fn default_session_file() -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match home {
        Some(h) => PathBuf::from(h).join(SESSION_DIR).join(SESSION_FILE),
        None => PathBuf::from(SESSION_DIR).join(SESSION_FILE),
    }
}

/// A native client has no page origin to be relative to, so an empty base is rejected.
pub fn normalize_base_url(raw: &str) -> ClientResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation("RECIPEBOX_API_URL must be an absolute http(s) URL"));
    }
    let url = Url::parse(trimmed).map_err(|e| ClientError::validation(format!("invalid base URL '{}': {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ClientError::validation(format!("unsupported URL scheme: {}", other))),
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Base address plus an absolute API path.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
