//! Display language selection: `lang` cookie, then the first entry of
//! `Accept-Language`, then the configured default.

use axum::http::{HeaderMap, header::ACCEPT_LANGUAGE};

use crate::config::WebConfig;
use crate::cookies;

pub fn resolve(headers: &HeaderMap, config: &WebConfig) -> String {
    if let Some(lang) = cookies::read(headers, &config.lang_cookie_name).and_then(primary_subtag) {
        return lang;
    }

    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|accept| accept.split(',').next())
        .and_then(|first| first.split(';').next())
        .and_then(primary_subtag)
        .unwrap_or_else(|| config.default_lang.clone())
}

/// `fr-FR` -> `fr`. Anything that is not 1-8 ASCII letters is ignored.
fn primary_subtag(tag: &str) -> Option<String> {
    let primary = tag.trim().split(['-', '_']).next()?;
    let ok = (1..=8).contains(&primary.len()) && primary.bytes().all(|b| b.is_ascii_alphabetic());
    ok.then(|| primary.to_ascii_lowercase())
}
