//! Backend-issued sessions and their cookie representation.
//!
//! The backend's client libraries persist a session as JSON in a cookie named
//! `sb-<project-ref>-auth-token`, base64url encoded behind a `base64-` prefix and
//! split into numbered chunks when it would exceed browser cookie limits. This module
//! keeps that layout so sessions stay readable by other clients of the same project.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Largest cookie value written before the session is split into chunks.
pub const MAX_CHUNK_SIZE: usize = 3180;
/// Prefix marking a base64url encoded cookie value.
pub const BASE64_PREFIX: &str = "base64-";
/// Sessions expiring within this window are refreshed before use.
pub const EXPIRY_MARGIN_SECONDS: i64 = 10;

/// The authenticated identity as reported by the auth service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl AuthUser {
    #[must_use]
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user.id)
            .finish()
    }
}

impl Session {
    /// Fill `expires_at` from `expires_in` when the token response omitted it.
    #[must_use]
    pub fn with_expiry_from(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(now.saturating_add(self.expires_in));
        }
        self
    }

    /// Whether the access token expires within [`EXPIRY_MARGIN_SECONDS`] of `now`.
    #[must_use]
    pub fn is_expiring(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at.saturating_sub(EXPIRY_MARGIN_SECONDS) <= now)
    }
}

/// Cookie name used by the backend client libraries for this project.
#[must_use]
pub fn storage_key(supabase_url: &Url) -> String {
    let project = supabase_url
        .host_str()
        .and_then(|host| host.split('.').next())
        .unwrap_or("local");
    format!("sb-{project}-auth-token")
}

/// Serialize a session into its cookie value.
///
/// # Errors
/// Returns an error if the session cannot be encoded as JSON.
pub fn encode(session: &Session) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(session)?;
    Ok(format!(
        "{BASE64_PREFIX}{}",
        Base64UrlUnpadded::encode_string(&json)
    ))
}

/// Parse a cookie value back into a session. Plain JSON values are accepted too.
#[must_use]
pub fn decode(value: &str) -> Option<Session> {
    let json = match value.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => Base64UrlUnpadded::decode_vec(encoded).ok()?,
        None => value.as_bytes().to_vec(),
    };
    serde_json::from_slice(&json).ok()
}

/// Split a cookie value into `(name, value)` pairs that each fit a browser cookie.
#[must_use]
pub fn chunk(key: &str, value: &str) -> Vec<(String, String)> {
    if value.len() <= MAX_CHUNK_SIZE {
        return vec![(key.to_string(), value.to_string())];
    }

    let mut chunks = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let mut end = MAX_CHUNK_SIZE.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        chunks.push((format!("{key}.{}", chunks.len()), head.to_string()));
        rest = tail;
    }
    chunks
}

/// Reassemble a cookie value from either a single cookie or its numbered chunks.
#[must_use]
pub fn combine(key: &str, cookies: &[(String, String)]) -> Option<String> {
    let find = |name: &str| {
        cookies
            .iter()
            .find(|(cookie, _)| cookie == name)
            .map(|(_, value)| value.as_str())
    };

    if let Some(value) = find(key) {
        return Some(value.to_string());
    }

    let mut combined = String::new();
    for index in 0.. {
        match find(&format!("{key}.{index}")) {
            Some(part) => combined.push_str(part),
            None => break,
        }
    }

    if combined.is_empty() {
        None
    } else {
        Some(combined)
    }
}

/// True when `name` is the session cookie or one of its chunks.
#[must_use]
pub fn is_session_cookie(key: &str, name: &str) -> bool {
    name == key
        || name
            .strip_prefix(key)
            .and_then(|suffix| suffix.strip_prefix('.'))
            .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
}
