pub mod auth;
pub mod dashboard;
pub mod health;
pub mod session;
pub mod settings;

use super::{flash, views, AppState};
use crate::backend::cookies::{parse_cookie_header, SetCookie};
use crate::forms::{login::redirect_target, Notification, Outcome, Submission, BUSY_MESSAGE};
use crate::schema::FieldErrors;
use axum::{
    http::{
        header::{HOST, ORIGIN, REFERER, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use leptos::prelude::AnyView;
use url::Url;

pub const SIDEBAR_COOKIE: &str = "sidebar_state";

/// What a form page needs to know after a submission.
pub struct FormState<'a> {
    pub errors: &'a FieldErrors,
    pub notification: Option<&'a Notification>,
    pub disabled: bool,
}

/// Append `Set-Cookie` headers to a response.
pub fn with_cookies(
    mut response: Response,
    cookies: impl IntoIterator<Item = HeaderValue>,
) -> Response {
    let headers = response.headers_mut();
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
    response
}

pub fn cookie_headers<'a>(cookies: impl IntoIterator<Item = &'a SetCookie>) -> Vec<HeaderValue> {
    cookies
        .into_iter()
        .filter_map(|cookie| cookie.to_header_value().ok())
        .collect()
}

/// A complete HTML page with the app metadata of `state`.
pub fn page(
    state: &AppState,
    title: &str,
    notification: Option<&Notification>,
    body: AnyView,
) -> String {
    views::render(views::Page {
        title,
        app: state.config.app(),
        notification,
        body,
    })
}

/// 303 to `location`, carrying `notification` to the next page.
pub fn redirect_with_flash(
    state: &AppState,
    location: &str,
    notification: &Notification,
    cookies: Vec<HeaderValue>,
) -> Response {
    let flash = flash::store(notification, state.config.secure_cookies())
        .and_then(|cookie| cookie.to_header_value().ok());
    with_cookies(
        Redirect::to(location).into_response(),
        cookies.into_iter().chain(flash),
    )
}

/// Turn a finished submission into a response; `render` draws the form page.
pub fn respond<F>(
    state: &AppState,
    submission: Submission,
    cookies: Vec<HeaderValue>,
    render: F,
) -> Response
where
    F: FnOnce(&FormState<'_>) -> String,
{
    let no_errors = FieldErrors::default();
    let (status, body) = match submission {
        Submission::Rejected(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            render(&FormState {
                errors: &errors,
                notification: None,
                disabled: false,
            }),
        ),
        Submission::Busy => (
            StatusCode::CONFLICT,
            render(&FormState {
                errors: &no_errors,
                notification: Some(&Notification::error(BUSY_MESSAGE)),
                disabled: false,
            }),
        ),
        Submission::Disabled(message) => (
            StatusCode::OK,
            render(&FormState {
                errors: &no_errors,
                notification: Some(&Notification::error(message)),
                disabled: true,
            }),
        ),
        Submission::Completed(Outcome {
            notification,
            navigate_to: Some(location),
        }) => return redirect_with_flash(state, &location, &notification, cookies),
        Submission::Completed(Outcome {
            notification,
            navigate_to: None,
        }) => (
            StatusCode::OK,
            render(&FormState {
                errors: &no_errors,
                notification: Some(&notification),
                disabled: false,
            }),
        ),
    };
    with_cookies((status, Html(body)).into_response(), cookies)
}

/// A rendered page plus the removal of the flash it consumed.
pub fn html(body: String, flash_removal: Option<SetCookie>) -> Response {
    with_cookies(
        Html(body).into_response(),
        cookie_headers(flash_removal.iter()),
    )
}

/// Scheme and host the request was made to, as seen by the browser.
pub fn request_origin(headers: &HeaderMap) -> String {
    if let Some(origin) = headers.get(ORIGIN).and_then(|value| value.to_str().ok()) {
        if origin != "null" {
            return origin.to_string();
        }
    }
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

/// The local page the request came from, `/` when unknown or foreign.
pub fn back_target(headers: &HeaderMap) -> String {
    let path = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| Url::parse(referer).ok())
        .map(|url| match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        });
    redirect_target(path.as_deref())
}

#[must_use]
pub fn sidebar_open(headers: &HeaderMap) -> bool {
    parse_cookie_header(headers)
        .iter()
        .any(|(name, value)| name == SIDEBAR_COOKIE && value == "true")
}
