use super::{
    Backend, BackendError, Credentials, OtpType, ProfileRow, ProfileUpsert, Upload,
    UserAttributes, PROFILES_TABLE,
};
use crate::{
    config::Config,
    session::{AuthUser, Session},
    APP_USER_AGENT,
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PROFILE_COLUMNS: &str = "full_name,username,avatar_url,website";
/// `PostgREST` media type returning a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// HTTP client for the auth, rest and storage APIs of one project.
#[derive(Clone, Debug)]
pub struct SupabaseClient {
    http: Client,
    base: Url,
    anon_key: SecretString,
}

impl SupabaseClient {
    /// Build a client from the validated configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        Self::with_base(config.supabase_url().clone(), config.supabase_anon_key().clone())
    }

    /// Build a client against an explicit base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base(mut base: Url, anon_key: SecretString) -> Result<Self, BackendError> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base,
            anon_key,
        })
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}storage/v1/object/public/{bucket}/{path}",
            self.base.as_str()
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|err| BackendError::Parse(format!("invalid endpoint {path}: {err}")))
    }

    /// A request carrying the project key, authorized as `bearer` or as the anon role.
    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let anon_key = self.anon_key.expose_secret();
        self.http
            .request(method, url)
            .header("apikey", anon_key)
            .bearer_auth(bearer.unwrap_or(anon_key))
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let session: Session = send_json(self.request(Method::POST, url, None).json(&body)).await?;
        Ok(session.with_expiry_from(chrono::Utc::now().timestamp()))
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    #[instrument(skip_all)]
    async fn sign_up(&self, credentials: &Credentials) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        send_empty(self.request(Method::POST, url, None).json(credentials)).await
    }

    #[instrument(skip_all)]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        self.token(
            "password",
            json!({ "email": credentials.email, "password": credentials.password }),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let result = send_empty(self.request(Method::POST, url, Some(&session.access_token))).await;
        match result {
            // The token is already gone on the backend; the local session still ends.
            Err(BackendError::Api { status, .. }) if status == 401 || status == 404 => {
                debug!("session already revoked (status {status})");
                Ok(())
            }
            other => other,
        }
    }

    #[instrument(skip(self, email))]
    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let mut url = self.endpoint("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        send_empty(
            self.request(Method::POST, url, None)
                .json(&json!({ "email": email })),
        )
        .await
    }

    #[instrument(skip(self, token_hash))]
    async fn verify_otp(&self, token_hash: &str, kind: OtpType) -> Result<Session, BackendError> {
        let url = self.endpoint("auth/v1/verify")?;
        let session: Session = send_json(
            self.request(Method::POST, url, None)
                .json(&json!({ "type": kind, "token_hash": token_hash })),
        )
        .await?;
        Ok(session.with_expiry_from(chrono::Utc::now().timestamp()))
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip_all, fields(user_id = %session.user.id))]
    async fn get_user(&self, session: &Session) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        send_json(self.request(Method::GET, url, Some(&session.access_token))).await
    }

    #[instrument(skip_all, fields(user_id = %session.user.id))]
    async fn update_user(
        &self,
        session: &Session,
        attributes: &UserAttributes,
    ) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        send_json(
            self.request(Method::PUT, url, Some(&session.access_token))
                .json(attributes),
        )
        .await
    }

    #[instrument(skip(self, session))]
    async fn read_profile(&self, session: &Session, id: Uuid) -> Result<ProfileRow, BackendError> {
        let mut url = self.endpoint(&format!("rest/v1/{PROFILES_TABLE}"))?;
        url.query_pairs_mut()
            .append_pair("select", PROFILE_COLUMNS)
            .append_pair("id", &format!("eq.{id}"));
        send_json(
            self.request(Method::GET, url, Some(&session.access_token))
                .header("Accept", SINGLE_OBJECT),
        )
        .await
    }

    #[instrument(skip_all, fields(user_id = %row.id))]
    async fn upsert_profile(
        &self,
        session: &Session,
        row: &ProfileUpsert,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{PROFILES_TABLE}"))?;
        send_empty(
            self.request(Method::POST, url, Some(&session.access_token))
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(row),
        )
        .await
    }

    #[instrument(skip(self, session, upload), fields(len = upload.bytes.len()))]
    async fn upload_file(
        &self,
        session: &Session,
        bucket: &str,
        path: &str,
        upload: &Upload,
    ) -> Result<String, BackendError> {
        let mut url = self.endpoint("storage/v1/object/")?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Parse("storage URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(bucket)
            .push(path);
        send_empty(
            self.request(Method::POST, url, Some(&session.access_token))
                .header(CONTENT_TYPE, upload.content_type.as_str())
                .header("x-upsert", "false")
                .body(upload.bytes.clone()),
        )
        .await?;
        Ok(self.public_url(bucket, path))
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    let response = builder
        .send()
        .await
        .map_err(|err| BackendError::Network(err.to_string()))?;
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    debug!("backend request failed with {status}: {message}");
    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
    send(builder)
        .await?
        .json()
        .await
        .map_err(|err| BackendError::Parse(err.to_string()))
}

async fn send_empty(builder: RequestBuilder) -> Result<(), BackendError> {
    send(builder).await.map(|_| ())
}

/// Pick the human readable message out of an error body.
///
/// The auth API reports `msg` or `error_description`, `PostgREST` and storage
/// report `message`, older endpoints only `error`.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str))
        })
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
