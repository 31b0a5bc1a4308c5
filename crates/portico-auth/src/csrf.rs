//! Double-submit CSRF token primitives.
//!
//! The token lives in a script-readable cookie and must be echoed back in
//! a form field or header on state-changing requests.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use subtle::ConstantTimeEq;

/// Generate a fresh 256-bit CSRF token, base64url-encoded.
pub fn generate_csrf_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether a cookie-held value looks like something we minted.
pub fn is_well_formed(token: &str) -> bool {
    URL_SAFE_NO_PAD
        .decode(token)
        .is_ok_and(|bytes| bytes.len() == 32)
}

/// Compare the cookie-held token with the submitted one in constant time.
/// Absence on either side is a mismatch.
pub fn verify_csrf_token(expected: &str, submitted: &str) -> bool {
    if expected.is_empty() || submitted.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_well_formed() {
        let a = generate_csrf_token();
        let b = generate_csrf_token();
        assert_ne!(a, b);
        assert!(is_well_formed(&a));
    }

    #[test]
    fn matching_tokens_verify() {
        let token = generate_csrf_token();
        assert!(verify_csrf_token(&token, &token.clone()));
    }

    #[test]
    fn mismatch_and_absence_fail() {
        let token = generate_csrf_token();
        assert!(!verify_csrf_token(&token, &generate_csrf_token()));
        assert!(!verify_csrf_token(&token, ""));
        assert!(!verify_csrf_token("", ""));
        assert!(!verify_csrf_token(&token, &token[..10]));
    }

    #[test]
    fn foreign_cookie_values_are_not_well_formed() {
        assert!(!is_well_formed("hello"));
        assert!(!is_well_formed(""));
    }
}
