//! Client factories and the per-request session client.

use super::{
    cookies::{CookieJar, CookieMode, SetCookie},
    Backend, BackendError, OtpType, ProfileRow, ProfileUpsert, SupabaseClient, Upload,
    UserAttributes,
};
use crate::{
    config::Config,
    session::{self, AuthUser, Session},
};
use axum::http::{HeaderMap, HeaderValue};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Session cookies outlive the access token; the refresh token keeps them useful.
const SESSION_COOKIE_MAX_AGE: i64 = 400 * 24 * 60 * 60;

/// The stateless client shared by every request.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn browser(config: &Config) -> Result<Arc<dyn Backend>, BackendError> {
    Ok(Arc::new(SupabaseClient::new(config)?))
}

/// A client bound to the cookies of one request.
#[must_use]
pub fn server(
    backend: Arc<dyn Backend>,
    config: &Config,
    headers: &HeaderMap,
    mode: CookieMode,
) -> SessionClient {
    SessionClient::new(
        backend,
        CookieJar::from_headers(headers, mode),
        session::storage_key(config.supabase_url()),
        config.secure_cookies(),
    )
}

/// Backend access on behalf of the user whose session cookie came with the request.
///
/// Session writes go through the [`CookieJar`]; when the jar is read-only the write
/// is dropped and the session only lives for the rest of the request.
pub struct SessionClient {
    backend: Arc<dyn Backend>,
    jar: CookieJar,
    storage_key: String,
    secure: bool,
    session: Option<Session>,
}

impl SessionClient {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, jar: CookieJar, storage_key: String, secure: bool) -> Self {
        let session = session::combine(&storage_key, jar.get_all())
            .as_deref()
            .and_then(session::decode);
        Self {
            backend,
            jar,
            storage_key,
            secure,
            session,
        }
    }

    /// The session read from the request cookies, without checking its expiry.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// `Set-Cookie` values queued by session writes.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.jar.set_cookie_headers()
    }

    /// The current session, refreshed first when its access token is about to expire.
    ///
    /// # Errors
    /// Returns [`BackendError::SessionMissing`] without a session, or the refresh
    /// error; a failed refresh also clears the stored session.
    pub async fn active_session(&mut self) -> Result<Session, BackendError> {
        let session = self.session.clone().ok_or(BackendError::SessionMissing)?;
        if !session.is_expiring(chrono::Utc::now().timestamp()) {
            return Ok(session);
        }

        debug!(user_id = %session.user.id, "refreshing session");
        match self.backend.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => {
                self.set_session(refreshed.clone());
                Ok(refreshed)
            }
            Err(err) => {
                warn!(user_id = %session.user.id, "session refresh failed: {err}");
                self.clear_session();
                Err(err)
            }
        }
    }

    /// Refresh the session if needed so the response carries fresh cookies.
    /// Returns whether a session is present afterwards.
    pub async fn refresh_if_needed(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.active_session().await.is_ok()
    }

    /// Persist `session` into the session cookie, replacing any previous one.
    pub fn set_session(&mut self, session: Session) {
        let value = match session::encode(&session) {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to encode session: {err}");
                return;
            }
        };

        let chunks = session::chunk(&self.storage_key, &value);
        let mut cookies: Vec<SetCookie> = self
            .stale_session_cookies()
            .into_iter()
            .filter(|name| !chunks.iter().any(|(chunk, _)| chunk == name))
            .map(|name| SetCookie::removal(name).secure(self.secure))
            .collect();
        cookies.extend(chunks.into_iter().map(|(name, value)| {
            SetCookie::new(name, value)
                .max_age(SESSION_COOKIE_MAX_AGE)
                .secure(self.secure)
        }));

        self.write(cookies);
        self.session = Some(session);
    }

    /// Remove the session cookie and all of its chunks.
    pub fn clear_session(&mut self) {
        let cookies = self
            .stale_session_cookies()
            .into_iter()
            .map(|name| SetCookie::removal(name).secure(self.secure))
            .collect();
        self.write(cookies);
        self.session = None;
    }

    fn stale_session_cookies(&self) -> Vec<String> {
        self.jar
            .get_all()
            .iter()
            .filter(|(name, _)| session::is_session_cookie(&self.storage_key, name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn write(&mut self, cookies: Vec<SetCookie>) {
        if cookies.is_empty() {
            return;
        }
        if let Err(err) = self.jar.set_all(cookies) {
            debug!("session cookies not written: {err}");
        }
    }

    /// Sign in without persisting the session; the caller decides whether to keep it.
    ///
    /// # Errors
    /// Returns the backend error when the credentials are rejected.
    pub async fn sign_in(
        &self,
        credentials: &super::Credentials,
    ) -> Result<Session, BackendError> {
        self.backend.sign_in(credentials).await
    }

    /// End the session on the backend and drop the local cookies.
    ///
    /// # Errors
    /// Returns the backend error; the local session is kept in that case.
    pub async fn sign_out(&mut self) -> Result<(), BackendError> {
        if let Some(session) = self.session.clone() {
            self.backend.sign_out(&session).await?;
        }
        self.clear_session();
        Ok(())
    }

    /// Redeem an email link token and persist the resulting session.
    ///
    /// # Errors
    /// Returns the backend error when the token is invalid or expired.
    pub async fn verify_otp(&mut self, token_hash: &str, kind: OtpType) -> Result<(), BackendError> {
        let session = self.backend.verify_otp(token_hash, kind).await?;
        self.set_session(session);
        Ok(())
    }

    /// # Errors
    /// Returns an error without a valid session or when the backend call fails.
    pub async fn get_user(&mut self) -> Result<AuthUser, BackendError> {
        let session = self.active_session().await?;
        self.backend.get_user(&session).await
    }

    /// # Errors
    /// Returns an error without a valid session or when the backend call fails.
    pub async fn update_user(
        &mut self,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, BackendError> {
        let session = self.active_session().await?;
        let user = self.backend.update_user(&session, attributes).await?;
        let mut updated = session;
        updated.user = user.clone();
        self.set_session(updated);
        Ok(user)
    }

    /// # Errors
    /// Returns an error without a valid session or when the backend call fails.
    pub async fn read_profile(&mut self, id: Uuid) -> Result<ProfileRow, BackendError> {
        let session = self.active_session().await?;
        self.backend.read_profile(&session, id).await
    }

    /// # Errors
    /// Returns an error without a valid session or when the backend call fails.
    pub async fn upsert_profile(&mut self, row: &ProfileUpsert) -> Result<(), BackendError> {
        let session = self.active_session().await?;
        self.backend.upsert_profile(&session, row).await
    }

    /// # Errors
    /// Returns an error without a valid session or when the backend call fails.
    pub async fn upload_file(
        &mut self,
        bucket: &str,
        path: &str,
        upload: &Upload,
    ) -> Result<String, BackendError> {
        let session = self.active_session().await?;
        self.backend.upload_file(&session, bucket, path, upload).await
    }
}
