use super::{back_target, html, redirect_with_flash, sidebar_open, with_cookies, SIDEBAR_COOKIE};
use crate::backend::{cookies::SetCookie, CookieMode};
use crate::forms::Notification;
use crate::user::CurrentUser;
use crate::web::{
    flash,
    views::shell::Shell,
    AppState,
};
use axum::{
    http::{HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use leptos::prelude::*;
use tracing::{info, warn};

const SIDEBAR_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Render `content` inside the dashboard shell for the current user.
pub fn shell_page(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    current: &CurrentUser,
    title: &str,
    notification: Option<&Notification>,
    content: AnyView,
) -> String {
    Shell {
        app: state.config.app(),
        current,
        sidebar_open: sidebar_open(headers),
        path,
    }
    .render(title, notification, content)
}

pub async fn index(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let (notification, removal) = flash::take(&headers, state.config.secure_cookies());
    let mut client = state.session_client(&headers, CookieMode::ReadOnly);
    let current = CurrentUser::load(&mut client).await;

    let greeting = current
        .user
        .as_ref()
        .and_then(|user| user.name.as_deref().or(user.email.as_deref()))
        .map(|name| format!("Welcome back, {name}."));
    let content = view! {
        <h1>"Dashboard"</h1>
        {greeting.map(|greeting| view! { <p>{greeting}</p> })}
    }
    .into_any();
    let body = shell_page(
        &state,
        &headers,
        uri.path(),
        &current,
        "Dashboard",
        notification.as_ref(),
        content,
    );
    html(body, removal)
}

/// End the session. On failure the user stays where they were.
pub async fn logout(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let mut client = state.session_client(&headers, CookieMode::Mutable);
    match client.sign_out().await {
        Ok(()) => {
            info!("signed out");
            with_cookies(
                Redirect::to("/login").into_response(),
                client.set_cookie_headers(),
            )
        }
        Err(err) => {
            warn!("sign out failed: {err}");
            redirect_with_flash(
                &state,
                &back_target(&headers),
                &Notification::error(format!("Error while logging out: {err}")),
                client.set_cookie_headers(),
            )
        }
    }
}

/// Flip the remembered sidebar state and return to the page.
pub async fn toggle_sidebar(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let open = !sidebar_open(&headers);
    let cookie = SetCookie::new(SIDEBAR_COOKIE, open.to_string())
        .max_age(SIDEBAR_MAX_AGE)
        .http_only(false)
        .secure(state.config.secure_cookies());
    with_cookies(
        Redirect::to(&back_target(&headers)).into_response(),
        cookie.to_header_value().ok(),
    )
}
