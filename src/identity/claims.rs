//! Bearer token claim decoding and role derivation.
//!
//! The claims read here are advisory. Nothing is verified client side: the
//! signature is never checked, so a caller can forge any role it likes. Roles
//! derived from these claims may only drive UI affordances (which menu items
//! and buttons are shown). The remote service remains the sole authority on
//! what a request is actually allowed to do.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";

/// Username that the fallback heuristic treats as an administrator.
const FALLBACK_ADMIN_USERNAME: &str = "admin";

/// Untrusted claims payload of a bearer token.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub roles: Option<Value>,
    #[serde(default)]
    pub scope: Option<Value>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// `roles` as a string list, if it is a non-empty array holding strings.
    fn role_list(&self) -> Option<Vec<String>> {
        let arr = self.roles.as_ref()?.as_array()?;
        let out: Vec<String> = arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
        if out.is_empty() { None } else { Some(out) }
    }

    /// `scope` split on whitespace, if it is a non-blank string.
    fn scope_list(&self) -> Option<Vec<String>> {
        let s = self.scope.as_ref()?.as_str()?;
        let out: Vec<String> = s.split_whitespace().map(str::to_string).collect();
        if out.is_empty() { None } else { Some(out) }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// Decode the middle segment of a three-part token.
///
/// Returns `None` for anything that is not `header.payload.signature` with a
/// base64url JSON object in the middle. Padding on the payload is tolerated.
/// The result is untrusted; see the module docs.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() { return None; }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    if !value.is_object() { return None; }
    serde_json::from_value(value).ok()
}

/// Roles used when the token carries no usable claims.
///
/// This is a placeholder heuristic kept for observable compatibility: a user
/// literally named `admin` is shown administrator affordances. It grants
/// nothing on the server.
pub fn fallback_roles(username: &str) -> Vec<String> {
    if username == FALLBACK_ADMIN_USERNAME {
        vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()]
    } else {
        vec![ROLE_USER.to_string()]
    }
}

/// Derive the authorization set for a freshly issued token.
///
/// Order: `roles` claim verbatim, else `scope` split on whitespace, else the
/// username fallback. Never fails and never returns an empty set. The output is
/// for UI gating only; see the module docs.
pub fn derive_roles(token: &str, username: &str) -> Vec<String> {
    let Some(claims) = decode_claims(token) else {
        return fallback_roles(username);
    };
    claims
        .role_list()
        .or_else(|| claims.scope_list())
        .unwrap_or_else(|| fallback_roles(username))
}

#[cfg(test)]
pub(crate) fn forge_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
