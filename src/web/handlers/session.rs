//! Session middleware.
//!
//! [`refresh_session`] runs for every request and keeps the backend session fresh
//! before a handler reads it. [`require_session`] guards the dashboard routes.

use crate::backend::CookieMode;
use crate::web::AppState;
use axum::{
    extract::Request,
    http::{
        header::{COOKIE, SET_COOKIE},
        uri::PathAndQuery,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use std::collections::HashSet;
use tracing::debug;
use url::form_urlencoded;

/// Refresh an expiring session and make both the handler and the browser see it.
///
/// The request's `Cookie` header is rewritten so the handler reads the refreshed
/// tokens. Cookies the handler sets itself win over the ones written here.
pub async fn refresh_session(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut client = state.session_client(request.headers(), CookieMode::Mutable);
    if client.session().is_none() {
        return next.run(request).await;
    }

    let signed_in = client.refresh_if_needed().await;
    let pending = client.jar().pending().to_vec();
    if pending.is_empty() {
        return next.run(request).await;
    }

    debug!(signed_in, cookies = pending.len(), "session cookies updated");
    match client.jar().request_header() {
        Some(cookie) => {
            request.headers_mut().insert(COOKIE, cookie);
        }
        None => {
            request.headers_mut().remove(COOKIE);
        }
    }

    let mut response = next.run(request).await;

    let written: HashSet<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split_once('=').map(|(name, _)| name.trim().to_string()))
        .collect();
    let headers = response.headers_mut();
    for cookie in pending.iter().filter(|cookie| !written.contains(&cookie.name)) {
        if let Ok(value) = cookie.to_header_value() {
            headers.append(SET_COOKIE, value);
        }
    }
    response
}

/// Send anonymous requests to the login page, remembering where they were going.
pub async fn require_session(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = state.session_client(request.headers(), CookieMode::ReadOnly);
    if client.session().is_some() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map_or("/", PathAndQuery::as_str);
    debug!(redirect_to = target, "no session, redirecting to login");
    Redirect::to(&login_location(target)).into_response()
}

/// `/login?redirect_to=<target>`.
#[must_use]
pub fn login_location(target: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect_to", target)
        .finish();
    format!("/login?{query}")
}
