//! Authentication configuration.

use std::fmt;

use chrono::Duration;

/// Upper bound for session and signup-link lifetimes (one year).
pub const MAX_LIFETIME_SECS: u64 = 366 * 86_400;

/// Lifetime in seconds as a `Duration`, capped at [`MAX_LIFETIME_SECS`].
pub fn lifetime(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_LIFETIME_SECS) as i64)
}

/// Configuration for token signing, sessions and password policy.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 key used to sign every new token.
    pub signing_key: Vec<u8>,
    /// Retired signing keys. Tokens signed with any of them still decode,
    /// so emailed links survive a key rotation until they expire.
    pub previous_signing_keys: Vec<Vec<u8>>,
    /// Session lifetime in seconds (default: 86_400 = 24 hours).
    pub session_lifetime_secs: u64,
    /// Lifetime of emailed signup links in seconds (default: 86_400).
    pub signup_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: Vec::new(),
            previous_signing_keys: Vec::new(),
            session_lifetime_secs: 86_400,
            signup_token_lifetime_secs: 86_400,
            pepper: None,
            min_password_length: 8,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_key", &"<redacted>")
            .field("previous_signing_keys", &self.previous_signing_keys.len())
            .field("session_lifetime_secs", &self.session_lifetime_secs)
            .field("signup_token_lifetime_secs", &self.signup_token_lifetime_secs)
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .field("min_password_length", &self.min_password_length)
            .finish()
    }
}
