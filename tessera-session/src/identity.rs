//! Session identity: where a session id comes from and how it is handed back.

use crate::config::CookieConfig;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use http::HeaderMap;
use std::collections::HashMap;

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Where a session's id was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// A request cookie
    Cookie,
    /// A request-scoped [`SessionContext`]
    Context,
}

/// Request-scoped values threaded explicitly through a call chain.
///
/// Carries the session id (under the configured session key) from the
/// point a session is bound to downstream calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    values: HashMap<String, String>,
}

impl SessionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this context with `key` bound to `value`.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Bind `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get the value bound to `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Find a cookie value in the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Render the `Set-Cookie` value carrying a session id.
pub fn session_cookie(cookie: &CookieConfig, session_id: &str) -> String {
    let mut header = format!("{}={}; Path={}", cookie.name, session_id, cookie.path);

    if let Some(ref domain) = cookie.domain {
        header.push_str(&format!("; Domain={}", domain));
    }

    if let Some(expires) = cookie.expires {
        header.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }

    if let Some(max_age) = cookie.max_age {
        header.push_str(&format!("; Max-Age={}", max_age));
    }

    header.push_str("; HttpOnly");

    if cookie.secure {
        header.push_str("; Secure");
    }

    if let Some(same_site) = cookie.same_site {
        header.push_str(&format!("; SameSite={}", same_site.as_str()));
    }

    header
}

/// Append the session cookie to a response's headers.
///
/// Values that are not valid header text are skipped; the session id is
/// still usable in-process.
pub fn write_cookie(response: &mut HeaderMap, cookie: &CookieConfig, session_id: &str) {
    match HeaderValue::from_str(&session_cookie(cookie, session_id)) {
        Ok(value) => {
            response.append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
    }
}
