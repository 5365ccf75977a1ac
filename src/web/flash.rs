//! One-shot notifications carried across a redirect.

use crate::backend::cookies::{parse_cookie_header, SetCookie};
use crate::forms::Notification;
use axum::http::HeaderMap;
use base64ct::{Base64UrlUnpadded, Encoding};
use tracing::debug;

pub const FLASH_COOKIE: &str = "portal_flash";

const FLASH_MAX_AGE: i64 = 60;

/// A cookie holding `notification` until the next page render.
#[must_use]
pub fn store(notification: &Notification, secure: bool) -> Option<SetCookie> {
    let json = match serde_json::to_vec(notification) {
        Ok(json) => json,
        Err(err) => {
            debug!("failed to encode flash: {err}");
            return None;
        }
    };
    Some(
        SetCookie::new(FLASH_COOKIE, Base64UrlUnpadded::encode_string(&json))
            .max_age(FLASH_MAX_AGE)
            .secure(secure),
    )
}

/// The pending notification of the request, plus the cookie that clears it.
#[must_use]
pub fn take(headers: &HeaderMap, secure: bool) -> (Option<Notification>, Option<SetCookie>) {
    let Some((_, value)) = parse_cookie_header(headers)
        .into_iter()
        .find(|(name, _)| name == FLASH_COOKIE)
    else {
        return (None, None);
    };
    let notification = Base64UrlUnpadded::decode_vec(&value)
        .ok()
        .and_then(|json| serde_json::from_slice(&json).ok());
    (
        notification,
        Some(SetCookie::removal(FLASH_COOKIE).secure(secure)),
    )
}
