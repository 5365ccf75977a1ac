//! Request cookie access for the server-side backend client.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use std::fmt;

/// Whether the current request may emit `Set-Cookie` headers.
///
/// Page renders run in `ReadOnly` mode; form handlers, route handlers and the
/// session refresh middleware run in `Mutable` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieMode {
    Mutable,
    ReadOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CookieWriteError;

impl fmt::Display for CookieWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cookies cannot be modified from a read-only context")
    }
}

impl std::error::Error for CookieWriteError {}

/// A cookie to send back to the browser. `Path=/` and `SameSite=Lax` are fixed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

impl SetCookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            http_only: true,
            secure: false,
        }
    }

    /// A cookie that makes the browser drop `name`.
    #[must_use]
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }

    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.max_age == Some(0)
    }

    /// Render the `Set-Cookie` header value.
    ///
    /// # Errors
    /// Returns an error if the name or value holds bytes not allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{}={}; Path=/", self.name, self.value);
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=Lax");
        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Parse every `Cookie` header of a request into `(name, value)` pairs.
#[must_use]
pub fn parse_cookie_header(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut cookies = Vec::new();
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let Some(name) = parts.next().map(str::trim).filter(|name| !name.is_empty()) else {
                continue;
            };
            let value = parts.next().map_or("", str::trim);
            cookies.push((name.to_string(), value.to_string()));
        }
    }
    cookies
}

/// The cookies of one request plus the writes queued for its response.
///
/// Writes are applied to the request view too, so later reads within the same
/// request observe them.
#[derive(Clone, Debug)]
pub struct CookieJar {
    mode: CookieMode,
    request: Vec<(String, String)>,
    pending: Vec<SetCookie>,
}

impl CookieJar {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, mode: CookieMode) -> Self {
        Self {
            mode,
            request: parse_cookie_header(headers),
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn get_all(&self) -> &[(String, String)] {
        &self.request
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.request
            .iter()
            .find(|(cookie, _)| cookie == name)
            .map(|(_, value)| value.as_str())
    }

    /// Queue cookie writes for the response.
    ///
    /// # Errors
    /// Returns [`CookieWriteError`] when the jar is read-only; nothing is queued.
    pub fn set_all(&mut self, cookies: Vec<SetCookie>) -> Result<(), CookieWriteError> {
        if self.mode == CookieMode::ReadOnly {
            return Err(CookieWriteError);
        }
        for cookie in cookies {
            self.request.retain(|(name, _)| name != &cookie.name);
            if !cookie.is_removal() {
                self.request.push((cookie.name.clone(), cookie.value.clone()));
            }
            self.pending.retain(|queued| queued.name != cookie.name);
            self.pending.push(cookie);
        }
        Ok(())
    }

    #[must_use]
    pub fn pending(&self) -> &[SetCookie] {
        &self.pending
    }

    /// `Set-Cookie` header values for every queued write.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.pending
            .iter()
            .filter_map(|cookie| cookie.to_header_value().ok())
            .collect()
    }

    /// A `Cookie` request header reflecting the queued writes, if any cookie is left.
    #[must_use]
    pub fn request_header(&self) -> Option<HeaderValue> {
        if self.request.is_empty() {
            return None;
        }
        let joined = self
            .request
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}
