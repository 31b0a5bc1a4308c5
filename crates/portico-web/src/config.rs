//! HTTP-layer configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// `SameSite` attribute for the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            other => Err(format!("unsupported SameSite value: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Apex domain; tenants live at `<slug>.<root_domain>`.
    pub root_domain: String,
    /// Scheme used when building emailed links.
    pub link_scheme: String,

    pub session_cookie_name: String,
    /// Adds the `Secure` attribute to every cookie we set.
    pub cookie_secure: bool,
    pub session_same_site: SameSite,

    pub csrf_cookie_name: String,
    pub csrf_header_name: String,
    pub csrf_form_field: String,
    pub csrf_cookie_max_age_secs: u64,

    pub lang_cookie_name: String,
    pub default_lang: String,

    /// Deadline for the whole request, store calls included.
    pub request_timeout: Duration,
    /// Largest urlencoded body the pipeline will buffer to find the CSRF
    /// form field.
    pub form_body_limit: usize,

    /// Form submissions allowed per source address per window.
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// Take the client address from `X-Forwarded-For` when present.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            root_domain: "localhost".into(),
            link_scheme: "https".into(),
            session_cookie_name: "portico_session".into(),
            cookie_secure: true,
            session_same_site: SameSite::Lax,
            csrf_cookie_name: "csrf_token".into(),
            csrf_header_name: "X-CSRF-Token".into(),
            csrf_form_field: "csrf_token".into(),
            csrf_cookie_max_age_secs: 2 * 60 * 60,
            lang_cookie_name: "lang".into(),
            default_lang: "en".into(),
            request_timeout: Duration::from_secs(10),
            form_body_limit: 64 * 1024,
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(60),
            trust_forwarded_for: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_parses_case_insensitively() {
        assert_eq!("Strict".parse::<SameSite>(), Ok(SameSite::Strict));
        assert_eq!("lax".parse::<SameSite>(), Ok(SameSite::Lax));
        assert!("none".parse::<SameSite>().is_err());
    }
}
