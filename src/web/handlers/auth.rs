//! Pages reachable without a session: login, registration and password recovery.

use super::{cookie_headers, html, page, redirect_with_flash, request_origin, respond};
use crate::backend::{CookieMode, OtpType};
use crate::forms::{
    forgot_password, login, new_form_id, register, reset_password, reset_password::LinkQuery,
    Notification,
};
use crate::schema::{
    FieldErrors, ForgotPasswordInput, LoginInput, RegistrationInput, ResetPasswordInput,
};
use crate::web::{
    flash,
    views::forms::{self as views, FormView},
    AppState,
};
use axum::{
    extract::{Query, RawQuery},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tracing::{info, warn};

pub const EMAIL_CONFIRMED_MESSAGE: &str = "Email confirmed.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub redirect_to: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default = "new_form_id")]
    pub form_id: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
    #[serde(flatten)]
    pub input: LoginInput,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default = "new_form_id")]
    pub form_id: String,
    #[serde(flatten)]
    pub input: RegistrationInput,
}

#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default = "new_form_id")]
    pub form_id: String,
    #[serde(flatten)]
    pub input: ForgotPasswordInput,
}

#[derive(Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default = "new_form_id")]
    pub form_id: String,
    #[serde(flatten)]
    pub input: ResetPasswordInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub next: Option<String>,
}

pub async fn login_page(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    let (notification, removal) = flash::take(&headers, state.config.secure_cookies());
    let view = FormView {
        form_id: &new_form_id(),
        errors: &FieldErrors::default(),
        disabled: false,
    };
    let body = views::login(&view, "", query.redirect_to.as_deref());
    html(page(&state, "Login", notification.as_ref(), body), removal)
}

pub async fn login(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut client = state.session_client(&headers, CookieMode::Mutable);
    let submission = login::submit(
        &mut client,
        &state.in_flight,
        state.events.as_ref(),
        &form.form_id,
        &form.input,
        form.redirect_to.as_deref(),
    )
    .await;

    respond(&state, submission, client.set_cookie_headers(), |result| {
        let view = FormView {
            form_id: &form.form_id,
            errors: result.errors,
            disabled: result.disabled,
        };
        let body = views::login(&view, &form.input.email, form.redirect_to.as_deref());
        page(&state, "Login", result.notification, body)
    })
}

pub async fn register_page(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let (notification, removal) = flash::take(&headers, state.config.secure_cookies());
    let view = FormView {
        form_id: &new_form_id(),
        errors: &FieldErrors::default(),
        disabled: false,
    };
    let body = views::register(&view, "");
    html(page(&state, "Register", notification.as_ref(), body), removal)
}

pub async fn register(
    Extension(state): Extension<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let submission = register::submit(
        state.backend.as_ref(),
        &state.in_flight,
        &form.form_id,
        &form.input,
    )
    .await;

    respond(&state, submission, Vec::new(), |result| {
        let view = FormView {
            form_id: &form.form_id,
            errors: result.errors,
            disabled: result.disabled,
        };
        let body = views::register(&view, &form.input.email);
        page(&state, "Register", result.notification, body)
    })
}

pub async fn forgot_password_page(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Response {
    let (notification, removal) = flash::take(&headers, state.config.secure_cookies());
    let view = FormView {
        form_id: &new_form_id(),
        errors: &FieldErrors::default(),
        disabled: false,
    };
    let body = views::forgot_password(&view, "");
    html(
        page(&state, "Forgot Password", notification.as_ref(), body),
        removal,
    )
}

pub async fn forgot_password(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let redirect_to = forgot_password::reset_link(state.config.site_url(), &request_origin(&headers));
    let submission = forgot_password::submit(
        state.backend.as_ref(),
        &state.in_flight,
        &form.form_id,
        &form.input,
        &redirect_to,
    )
    .await;

    respond(&state, submission, Vec::new(), |result| {
        let view = FormView {
            form_id: &form.form_id,
            errors: result.errors,
            disabled: result.disabled,
        };
        let body = views::forgot_password(&view, &form.input.email);
        page(&state, "Forgot Password", result.notification, body)
    })
}

fn reset_action(query: Option<&str>) -> String {
    match query.filter(|query| !query.is_empty()) {
        Some(query) => format!("{}?{query}", forgot_password::RESET_PATH),
        None => forgot_password::RESET_PATH.to_string(),
    }
}

/// The reset form. A recovery token in the link is exchanged for a session
/// and the browser is sent back to the same page without it.
pub async fn reset_password_page(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(link): Query<LinkQuery>,
    RawQuery(raw): RawQuery,
) -> Response {
    let secure = state.config.secure_cookies();
    let (mut notification, removal) = flash::take(&headers, secure);
    let mut disabled = false;

    if let Some(message) = link.link_error() {
        warn!("reset link rejected: {message}");
        notification = Some(Notification::error(message));
        disabled = true;
    } else if link.recovery_token().is_some() {
        let mut client = state.session_client(&headers, CookieMode::Mutable);
        match reset_password::exchange_link(&mut client, &link).await {
            Ok(_) => {
                info!("recovery link exchanged");
                let mut cookies = client.set_cookie_headers();
                cookies.extend(cookie_headers(removal.iter()));
                return super::with_cookies(
                    Redirect::to(forgot_password::RESET_PATH).into_response(),
                    cookies,
                );
            }
            Err(err) => {
                warn!("recovery link exchange failed: {err}");
                notification = Some(Notification::error(err.to_string()));
                disabled = true;
            }
        }
    }

    let view = FormView {
        form_id: &new_form_id(),
        errors: &FieldErrors::default(),
        disabled,
    };
    let action = if disabled {
        reset_action(raw.as_deref())
    } else {
        forgot_password::RESET_PATH.to_string()
    };
    let body = views::reset_password(&view, &action);
    html(
        page(&state, "Reset Password", notification.as_ref(), body),
        removal,
    )
}

pub async fn reset_password(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(link): Query<LinkQuery>,
    RawQuery(raw): RawQuery,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let mut client = state.session_client(&headers, CookieMode::Mutable);
    let submission = reset_password::submit(
        &mut client,
        &state.in_flight,
        &form.form_id,
        &form.input,
        &link,
    )
    .await;

    let action = reset_action(raw.as_deref());
    respond(&state, submission, client.set_cookie_headers(), |result| {
        let view = FormView {
            form_id: &form.form_id,
            errors: result.errors,
            disabled: result.disabled,
        };
        let body = views::reset_password(&view, &action);
        page(&state, "Reset Password", result.notification, body)
    })
}

/// Landing page of the email confirmation link.
pub async fn confirm(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    let kind = query.kind.as_deref().and_then(OtpType::parse);
    let (Some(token_hash), Some(kind)) = (query.token_hash.as_deref(), kind) else {
        warn!("confirmation link without token");
        return redirect_with_flash(
            &state,
            "/login",
            &Notification::error("Invalid confirmation link."),
            Vec::new(),
        );
    };

    let mut client = state.session_client(&headers, CookieMode::Mutable);
    match client.verify_otp(token_hash, kind).await {
        Ok(()) => {
            info!(?kind, "email link verified");
            redirect_with_flash(
                &state,
                &login::redirect_target(query.next.as_deref()),
                &Notification::success(EMAIL_CONFIRMED_MESSAGE),
                client.set_cookie_headers(),
            )
        }
        Err(err) => {
            warn!(?kind, "email link verification failed: {err}");
            redirect_with_flash(
                &state,
                "/login",
                &Notification::error(err.to_string()),
                client.set_cookie_headers(),
            )
        }
    }
}
