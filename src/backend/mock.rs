//! In-memory backend double for handler and form tests.

use super::{
    Backend, BackendError, CookieJar, CookieMode, Credentials, OtpType, ProfileRow,
    ProfileUpsert, SessionClient, Upload, UserAttributes,
};
use crate::forms::{FormKey, InFlight};
use crate::session::{self, tests::session_for, AuthUser, Session};
use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Cookie name for a backend at `https://test.supabase.co`.
pub(crate) const STORAGE_KEY: &str = "sb-test-auth-token";

/// Request headers carrying `session` in its (possibly chunked) cookie.
#[allow(clippy::unwrap_used)]
pub(crate) fn cookie_headers(session: &Session) -> HeaderMap {
    let value = session::encode(session).unwrap();
    let cookie = session::chunk(STORAGE_KEY, &value)
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());
    headers
}

/// A mutable session client over `backend`, signed in as `session` when given.
pub(crate) fn session_client(backend: Arc<MockBackend>, session: Option<&Session>) -> SessionClient {
    let headers = session.map(cookie_headers).unwrap_or_default();
    SessionClient::new(
        backend,
        CookieJar::from_headers(&headers, CookieMode::Mutable),
        STORAGE_KEY.to_string(),
        false,
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    SignUp(String),
    SignIn(String),
    SignOut,
    RequestPasswordReset { email: String, redirect_to: String },
    VerifyOtp(String, OtpType),
    RefreshSession,
    GetUser,
    UpdateUser(UserAttributes),
    ReadProfile(Uuid),
    UpsertProfile(ProfileUpsert),
    UploadFile { bucket: String, path: String },
}

/// Canned responses per operation plus a log of every call made.
pub(crate) struct MockBackend {
    pub(crate) sign_up: Result<(), BackendError>,
    pub(crate) sign_in: Result<Session, BackendError>,
    pub(crate) sign_out: Result<(), BackendError>,
    pub(crate) password_reset: Result<(), BackendError>,
    pub(crate) verify_otp: Result<Session, BackendError>,
    pub(crate) refresh: Result<Session, BackendError>,
    pub(crate) get_user: Result<AuthUser, BackendError>,
    pub(crate) update_user: Result<AuthUser, BackendError>,
    pub(crate) read_profile: Result<ProfileRow, BackendError>,
    pub(crate) upsert_profile: Result<(), BackendError>,
    pub(crate) upload_file: Result<String, BackendError>,
    pub(crate) calls: Mutex<Vec<Call>>,
    /// When set, every call records whether the watched form was in flight.
    pub(crate) watch: Mutex<Option<(InFlight, FormKey)>>,
    pub(crate) observed_in_flight: Mutex<Vec<bool>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        let session = session_for("ada@example.com", true);
        Self {
            sign_up: Ok(()),
            sign_in: Ok(session.clone()),
            sign_out: Ok(()),
            password_reset: Ok(()),
            verify_otp: Ok(session.clone()),
            refresh: Ok(session.clone()),
            get_user: Ok(session.user.clone()),
            update_user: Ok(session.user),
            read_profile: Ok(ProfileRow::default()),
            upsert_profile: Ok(()),
            upload_file: Ok("https://abc.supabase.co/storage/v1/object/public/avatars/a.png"
                .to_string()),
            calls: Mutex::new(Vec::new()),
            watch: Mutex::new(None),
            observed_in_flight: Mutex::new(Vec::new()),
        }
    }
}

#[allow(clippy::unwrap_used)]
impl MockBackend {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn watch_in_flight(&self, in_flight: InFlight, key: FormKey) {
        *self.watch.lock().unwrap() = Some((in_flight, key));
    }

    pub(crate) fn observed_in_flight(&self) -> Vec<bool> {
        self.observed_in_flight.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        if let Some((in_flight, key)) = self.watch.lock().unwrap().as_ref() {
            self.observed_in_flight
                .lock()
                .unwrap()
                .push(in_flight.is_in_flight(key));
        }
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<(), BackendError> {
        self.record(Call::SignUp(credentials.email.clone()));
        self.sign_up.clone()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        self.record(Call::SignIn(credentials.email.clone()));
        self.sign_in.clone()
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), BackendError> {
        self.record(Call::SignOut);
        self.sign_out.clone()
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        self.record(Call::RequestPasswordReset {
            email: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        self.password_reset.clone()
    }

    async fn verify_otp(&self, token_hash: &str, kind: OtpType) -> Result<Session, BackendError> {
        self.record(Call::VerifyOtp(token_hash.to_string(), kind));
        self.verify_otp.clone()
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, BackendError> {
        self.record(Call::RefreshSession);
        self.refresh.clone()
    }

    async fn get_user(&self, _session: &Session) -> Result<AuthUser, BackendError> {
        self.record(Call::GetUser);
        self.get_user.clone()
    }

    async fn update_user(
        &self,
        _session: &Session,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, BackendError> {
        self.record(Call::UpdateUser(attributes.clone()));
        self.update_user.clone()
    }

    async fn read_profile(&self, _session: &Session, id: Uuid) -> Result<ProfileRow, BackendError> {
        self.record(Call::ReadProfile(id));
        self.read_profile.clone()
    }

    async fn upsert_profile(
        &self,
        _session: &Session,
        row: &ProfileUpsert,
    ) -> Result<(), BackendError> {
        self.record(Call::UpsertProfile(row.clone()));
        self.upsert_profile.clone()
    }

    async fn upload_file(
        &self,
        _session: &Session,
        bucket: &str,
        path: &str,
        _upload: &Upload,
    ) -> Result<String, BackendError> {
        self.record(Call::UploadFile {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        self.upload_file.clone()
    }
}
