//! Cookie parsing and `Set-Cookie` construction.
//!
//! Values we set are base64url or hex and never need quoting.

use axum::http::{HeaderMap, header::COOKIE};

use crate::config::WebConfig;

/// First non-empty value of cookie `name` across all `Cookie` headers.
pub fn read<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            pair.trim()
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .find(|value| !value.is_empty())
}

fn secure(config: &WebConfig) -> &'static str {
    if config.cookie_secure { "; Secure" } else { "" }
}

/// Session cookie: `HttpOnly`, host-only, lives as long as the session.
pub fn session(config: &WebConfig, token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={token}; HttpOnly{}; SameSite={}; Path=/; Max-Age={max_age_secs}",
        config.session_cookie_name,
        secure(config),
        config.session_same_site,
    )
}

pub fn clear_session(config: &WebConfig) -> String {
    format!(
        "{}=; HttpOnly{}; SameSite={}; Path=/; Max-Age=0",
        config.session_cookie_name,
        secure(config),
        config.session_same_site,
    )
}

/// CSRF cookie: readable by page script so it can be echoed back.
pub fn csrf(config: &WebConfig, token: &str) -> String {
    format!(
        "{}={token}{}; SameSite=Lax; Path=/; Max-Age={}",
        config.csrf_cookie_name,
        secure(config),
        config.csrf_cookie_max_age_secs,
    )
}
