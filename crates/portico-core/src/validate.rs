//! Syntactic validation of user-supplied identifiers.
//!
//! Slugs are checked once, when a tenant signup is accepted; the tenant
//! resolver relies on that and does not re-validate hosts.

use std::sync::LazyLock;

use regex::Regex;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("slug pattern is valid")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is valid")
});

/// Derive a tenant slug from an organization name: whitespace removed,
/// lowercased. The result still has to pass [`is_valid_slug`].
pub fn slugify(org_name: &str) -> String {
    org_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A DNS-label-shaped slug: 1–63 chars of `[a-z0-9-]`, no leading or
/// trailing hyphen.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Canonical form used for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
