//! Router tests against the in-memory backend.

use super::{router, AppState};
use crate::analytics::{tests::RecordingTracker, LOGIN_SUCCESSFUL};
use crate::backend::mock::{cookie_headers, Call, MockBackend, STORAGE_KEY};
use crate::backend::{BackendError, OtpType};
use crate::config::RawConfig;
use crate::session::tests::session_for;
use crate::session::Session;
use crate::web::flash::FLASH_COOKIE;
use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, HOST, LOCATION, REFERER, SET_COOKIE},
        Request, Response, StatusCode,
    },
};
use std::sync::Arc;
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

struct Harness {
    backend: Arc<MockBackend>,
    events: Arc<RecordingTracker>,
    state: AppState,
}

fn harness(backend: MockBackend) -> Result<Harness> {
    let config = RawConfig {
        supabase_url: Some("https://test.supabase.co".to_string()),
        supabase_anon_key: Some("anon-key".to_string()),
        app_name: Some("Portal".to_string()),
        ..RawConfig::default()
    }
    .validate()?;
    let backend = Arc::new(backend);
    let events = Arc::new(RecordingTracker::default());
    let state = AppState::new(Arc::new(config), backend.clone(), events.clone());
    Ok(Harness {
        backend,
        events,
        state,
    })
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        Ok(router(self.state.clone()).oneshot(request).await?)
    }
}

fn session_cookie(session: &Session) -> Result<String> {
    let headers = cookie_headers(session);
    Ok(headers
        .get(COOKIE)
        .context("missing cookie header")?
        .to_str()?
        .to_string())
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn anonymous_dashboard_request_redirects_to_login() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .uri("/settings/account")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        Some("/login?redirect_to=%2Fsettings%2Faccount")
    );
    assert!(app.backend.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_id() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn login_page_keeps_redirect_target() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .uri("/login?redirect_to=%2Fsettings%2Faccount")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains(r#"name="redirect_to" value="/settings/account""#));
    assert!(html.contains(r#"name="form_id""#));
    Ok(())
}

#[tokio::test]
async fn invalid_login_is_rendered_without_backend_call() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from("form_id=f1&email=not-an-email&password=x"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await?;
    assert!(html.contains("Invalid email"));
    assert!(html.contains(r#"value="not-an-email""#));
    assert!(app.backend.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn login_sets_session_and_redirects() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from(
                    "form_id=f1&email=ada%40example.com&password=secret1&redirect_to=%2Fsettings%2Faccount",
                ))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/settings/account"));
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{STORAGE_KEY}=base64-"))));
    assert!(cookies
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{FLASH_COOKIE}="))));
    assert_eq!(
        app.backend.calls(),
        vec![Call::SignIn("ada@example.com".to_string())]
    );
    assert_eq!(app.events.names(), vec![LOGIN_SUCCESSFUL.to_string()]);
    Ok(())
}

#[tokio::test]
async fn unconfirmed_login_stays_on_page() -> Result<()> {
    let app = harness(MockBackend {
        sign_in: Ok(session_for("ada@example.com", false)),
        ..MockBackend::default()
    })?;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from("form_id=f1&email=ada%40example.com&password=secret1"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    let html = body_text(response).await?;
    assert!(html.contains("Please confirm your email before logging in."));
    Ok(())
}

#[tokio::test]
async fn flash_is_shown_once() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let Some(flash) = crate::web::flash::store(
        &crate::forms::Notification::success("Registration successful."),
        false,
    ) else {
        anyhow::bail!("flash not encoded");
    };
    let response = app
        .send(
            Request::builder()
                .uri("/login")
                .header(COOKIE, format!("{FLASH_COOKIE}={}", flash.value))
                .body(Body::empty())?,
        )
        .await?;

    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{FLASH_COOKIE}=;")) && cookie.contains("Max-Age=0")));
    let html = body_text(response).await?;
    assert!(html.contains(r#"role="status">Registration successful.</div>"#));
    Ok(())
}

#[tokio::test]
async fn register_redirects_to_login() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from(
                    "form_id=f1&email=ada%40example.com&password=secret1&confirm_password=secret1",
                ))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert_eq!(
        app.backend.calls(),
        vec![Call::SignUp("ada@example.com".to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn forgot_password_links_back_to_this_site() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/forgot-password")
                .header(HOST, "localhost:8080")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from("form_id=f1&email=ada%40example.com"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.backend.calls(),
        vec![Call::RequestPasswordReset {
            email: "ada@example.com".to_string(),
            redirect_to: "http://localhost:8080/reset-password".to_string(),
        }]
    );
    let html = body_text(response).await?;
    assert!(html.contains("Password reset email sent. Check your inbox."));
    Ok(())
}

#[tokio::test]
async fn reset_link_error_disables_form() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .uri("/reset-password?error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid+or+has+expired")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Email link is invalid or has expired"));
    assert!(html.contains("disabled"));
    assert!(app.backend.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn recovery_token_is_exchanged_for_session() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .uri("/reset-password?token_hash=abc&type=recovery")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/reset-password"));
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{STORAGE_KEY}="))));
    assert_eq!(
        app.backend.calls(),
        vec![Call::VerifyOtp("abc".to_string(), OtpType::Recovery)]
    );
    Ok(())
}

#[tokio::test]
async fn confirmation_link_follows_local_next() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .uri("/auth/confirm?token_hash=t&type=email&next=%2Fsettings%2Fprofile")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/settings/profile"));
    assert_eq!(
        app.backend.calls(),
        vec![Call::VerifyOtp("t".to_string(), OtpType::Email)]
    );
    Ok(())
}

#[tokio::test]
async fn dashboard_shows_signed_in_user() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let session = session_for("ada@example.com", true);
    let response = app
        .send(
            Request::builder()
                .uri("/")
                .header(COOKIE, session_cookie(&session)?)
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    let html = body_text(response).await?;
    assert!(html.contains("ada@example.com"));
    assert!(html.contains(r#"action="/logout""#));
    Ok(())
}

#[tokio::test]
async fn expiring_session_is_refreshed_by_middleware() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let mut session = session_for("ada@example.com", true);
    session.expires_at = Some(chrono::Utc::now().timestamp());
    let response = app
        .send(
            Request::builder()
                .uri("/settings/appearance")
                .header(COOKIE, session_cookie(&session)?)
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{STORAGE_KEY}=base64-"))));
    let calls = app.backend.calls();
    assert_eq!(calls.first(), Some(&Call::RefreshSession));
    assert!(!calls[1..].contains(&Call::RefreshSession));
    Ok(())
}

#[tokio::test]
async fn session_cookie_with_minimal_expiry_is_refreshed() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let mut session = session_for("ada@example.com", true);
    session.expires_at = Some(i64::MIN);
    let response = app
        .send(
            Request::builder()
                .uri("/")
                .header(COOKIE, session_cookie(&session)?)
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.backend.calls().first(), Some(&Call::RefreshSession));
    Ok(())
}

#[tokio::test]
async fn failed_refresh_signs_the_user_out() -> Result<()> {
    let app = harness(MockBackend {
        refresh: Err(BackendError::Api {
            status: 400,
            message: "Invalid Refresh Token: Already Used".to_string(),
        }),
        ..MockBackend::default()
    })?;
    let mut session = session_for("ada@example.com", true);
    session.expires_at = Some(chrono::Utc::now().timestamp());
    let response = app
        .send(
            Request::builder()
                .uri("/settings/display")
                .header(COOKIE, session_cookie(&session)?)
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        Some("/login?redirect_to=%2Fsettings%2Fdisplay")
    );
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{STORAGE_KEY}=;")) && cookie.contains("Max-Age=0")));
    Ok(())
}

#[tokio::test]
async fn account_update_renders_notification() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let session = session_for("ada@example.com", true);
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/settings/account")
                .header(COOKIE, session_cookie(&session)?)
                .header(CONTENT_TYPE, FORM)
                .body(Body::from(
                    "form_id=f1&email=ada%40example.com&phone=5551234567&password=&confirm_password=",
                ))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Account updated."));
    assert!(matches!(
        app.backend.calls().first(),
        Some(Call::UpdateUser(attributes)) if attributes.password.is_none()
    ));
    Ok(())
}

#[tokio::test]
async fn profile_form_uploads_avatar() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let session = session_for("ada@example.com", true);
    let boundary = "portal-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"form_id\"\r\n\r\n\
         f1\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"username\"\r\n\r\n\
         ada\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"full_name\"\r\n\r\n\
         Ada Lovelace\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"website\"\r\n\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         PNG\r\n\
         --{boundary}--\r\n"
    );
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/settings/profile")
                .header(COOKIE, session_cookie(&session)?)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Profile updated."));
    let calls = app.backend.calls();
    assert!(matches!(calls.first(), Some(Call::UploadFile { bucket, .. }) if bucket == "avatars"));
    assert!(matches!(calls.get(1), Some(Call::UpsertProfile(row)) if row.username == "ada"));
    Ok(())
}

#[tokio::test]
async fn logout_clears_session() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let session = session_for("ada@example.com", true);
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(COOKIE, session_cookie(&session)?)
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{STORAGE_KEY}=;"))));
    assert_eq!(app.backend.calls(), vec![Call::SignOut]);
    Ok(())
}

#[tokio::test]
async fn failed_logout_returns_to_page_with_error() -> Result<()> {
    let app = harness(MockBackend {
        sign_out: Err(BackendError::Network("connection refused".to_string())),
        ..MockBackend::default()
    })?;
    let session = session_for("ada@example.com", true);
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(COOKIE, session_cookie(&session)?)
                .header(REFERER, "http://localhost:8080/settings/account")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/settings/account"));
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{FLASH_COOKIE}="))));
    assert!(!cookies
        .iter()
        .any(|cookie| cookie.starts_with(&format!("{STORAGE_KEY}="))));
    Ok(())
}

#[tokio::test]
async fn sidebar_toggle_flips_cookie() -> Result<()> {
    let app = harness(MockBackend::default())?;
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/sidebar")
                .header(COOKIE, "sidebar_state=true")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("sidebar_state=false; Path=/; SameSite=Lax"));
    assert!(!cookies[0].contains("HttpOnly"));
    Ok(())
}
