//! Contract with the hosted backend-as-a-service.
//!
//! [`Backend`] lists every remote operation the portal needs. [`SupabaseClient`] is
//! the production implementation over the REST APIs; tests swap in an in-memory
//! double. Two factories share one validated [`Config`](crate::config::Config):
//!
//! - [`client::browser`] returns the plain client used for anonymous calls such as
//!   sign-up and password reset requests. It carries no request state.
//! - [`client::server`] wraps the same client in a [`SessionClient`] bound to one
//!   request's cookies, so it can read, refresh and persist the session.

pub mod client;
pub mod cookies;
mod supabase;

#[cfg(test)]
pub(crate) mod mock;

pub use client::SessionClient;
pub use cookies::{CookieJar, CookieMode, SetCookie};
pub use supabase::SupabaseClient;

use crate::session::{AuthUser, Session};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Storage bucket holding profile pictures.
pub const AVATAR_BUCKET: &str = "avatars";
/// Table holding one profile row per auth user, keyed by the user id.
pub const PROFILES_TABLE: &str = "profiles";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The backend answered with an error status; `message` is what it reported.
    Api { status: u16, message: String },
    Network(String),
    Parse(String),
    /// The operation needs a signed-in user and the request carries no session.
    SessionMissing,
}

impl fmt::Display for BackendError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Api { message, .. } => write!(formatter, "{message}"),
            BackendError::Network(message) => write!(formatter, "Network error: {message}"),
            BackendError::Parse(message) => write!(formatter, "Response error: {message}"),
            BackendError::SessionMissing => write!(formatter, "Auth session missing!"),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// One-time token flavours accepted by the verify endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Signup,
    Email,
    Recovery,
    EmailChange,
}

impl OtpType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signup" => Some(Self::Signup),
            "email" => Some(Self::Email),
            "recovery" => Some(Self::Recovery),
            "email_change" => Some(Self::EmailChange),
            _ => None,
        }
    }
}

/// Attributes sent to the update-user endpoint. Absent fields are left unchanged.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserAttributes {
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for UserAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAttributes")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Columns of the profile row read by the portal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Profile row written on update; absent optional columns keep their stored value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileUpsert {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A file received from a form and destined for object storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<(), BackendError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError>;

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError>;

    /// Ask the backend to email a recovery link that lands on `redirect_to`.
    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError>;

    /// Exchange a hashed one-time token from an email link for a session.
    async fn verify_otp(&self, token_hash: &str, kind: OtpType) -> Result<Session, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    async fn get_user(&self, session: &Session) -> Result<AuthUser, BackendError>;

    async fn update_user(
        &self,
        session: &Session,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, BackendError>;

    async fn read_profile(&self, session: &Session, id: Uuid) -> Result<ProfileRow, BackendError>;

    async fn upsert_profile(
        &self,
        session: &Session,
        row: &ProfileUpsert,
    ) -> Result<(), BackendError>;

    /// Store `upload` at `bucket/path` and return its public URL.
    async fn upload_file(
        &self,
        session: &Session,
        bucket: &str,
        path: &str,
        upload: &Upload,
    ) -> Result<String, BackendError>;
}
