//! Signed, expiring tokens for emailed links, plus the opaque random
//! tokens used for sessions.
//!
//! Wire format of a signed token:
//!
//! ```text
//! base64url(field_1 | ... | field_n | exp) "." base64url(HMAC-SHA256(payload))
//! ```
//!
//! `exp` is a Unix timestamp in seconds. Fields are joined with `|`, so
//! a field containing `|` is refused at encode time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

const FIELD_SEPARATOR: char = '|';

/// HMAC-SHA256 codec for signed, expiring tokens.
///
/// Encoding always uses the current key. Decoding tries the current key,
/// then each previous key.
#[derive(Clone)]
pub struct TokenCodec {
    current: Vec<u8>,
    previous: Vec<Vec<u8>>,
}

impl TokenCodec {
    pub fn new(current: Vec<u8>, previous: Vec<Vec<u8>>) -> Self {
        Self { current, previous }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.signing_key.clone(),
            config.previous_signing_keys.clone(),
        )
    }

    pub fn encode(
        &self,
        fields: &[&str],
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        if fields.iter().any(|f| f.contains(FIELD_SEPARATOR)) {
            return Err(AuthError::Crypto(
                "token field contains the field separator".into(),
            ));
        }

        let mut payload = fields.join("|");
        if !fields.is_empty() {
            payload.push(FIELD_SEPARATOR);
        }
        payload.push_str(&expires_at.timestamp().to_string());

        let mac = sign(&self.current, payload.as_bytes())?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(mac)
        ))
    }

    /// Verify and decode a token, returning its fields (without `exp`).
    ///
    /// Every failure is the same [`AuthError::TokenInvalid`].
    pub fn decode(&self, token: &str) -> Result<Vec<String>, AuthError> {
        self.decode_at(token, Utc::now())
    }

    /// [`decode`](Self::decode) against an explicit clock. A token is
    /// valid strictly before its expiry.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Vec<String>, AuthError> {
        let (payload_b64, mac_b64) = token.split_once('.').ok_or(AuthError::TokenInvalid)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::TokenInvalid)?;
        let mac = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| AuthError::TokenInvalid)?;

        let verified = std::iter::once(&self.current)
            .chain(self.previous.iter())
            .any(|key| verify(key, &payload, &mac));
        if !verified {
            return Err(AuthError::TokenInvalid);
        }

        let payload = String::from_utf8(payload).map_err(|_| AuthError::TokenInvalid)?;
        let mut fields: Vec<String> = payload.split(FIELD_SEPARATOR).map(String::from).collect();
        let exp: i64 = fields
            .pop()
            .and_then(|e| e.parse().ok())
            .ok_or(AuthError::TokenInvalid)?;

        if now.timestamp() >= exp {
            return Err(AuthError::TokenInvalid);
        }
        Ok(fields)
    }
}

fn sign(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuthError::Crypto(format!("bad signing key: {e}")))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time MAC comparison (`verify_slice`).
fn verify(key: &[u8], payload: &[u8], tag: &[u8]) -> bool {
    match HmacSha256::new_from_slice(key) {
        Ok(mut mac) => {
            mac.update(payload);
            mac.verify_slice(tag).is_ok()
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Signup claims
// ---------------------------------------------------------------------------

/// What an emailed signup link asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupClaims {
    /// Root-domain signup creating a new organization.
    Tenant { email: String, org_name: String },
    /// Tenant-domain signup joining an existing organization.
    Member { email: String, tenant_id: Uuid },
}

impl SignupClaims {
    pub fn email(&self) -> &str {
        match self {
            SignupClaims::Tenant { email, .. } | SignupClaims::Member { email, .. } => email,
        }
    }
}

impl TokenCodec {
    pub fn encode_signup(
        &self,
        claims: &SignupClaims,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        match claims {
            SignupClaims::Tenant { email, org_name } => {
                self.encode(&["tenant", email, org_name], expires_at)
            }
            SignupClaims::Member { email, tenant_id } => {
                let tenant_id = tenant_id.to_string();
                self.encode(&["user", email, &tenant_id], expires_at)
            }
        }
    }

    pub fn decode_signup(&self, token: &str) -> Result<SignupClaims, AuthError> {
        let fields = self.decode(token)?;
        match fields.as_slice() {
            [kind, email, org_name] if kind == "tenant" => Ok(SignupClaims::Tenant {
                email: email.clone(),
                org_name: org_name.clone(),
            }),
            [kind, email, tenant_id] if kind == "user" => Ok(SignupClaims::Member {
                email: email.clone(),
                tenant_id: Uuid::parse_str(tenant_id).map_err(|_| AuthError::TokenInvalid)?,
            }),
            _ => Err(AuthError::TokenInvalid),
        }
    }
}

// ---------------------------------------------------------------------------
// Opaque tokens
// ---------------------------------------------------------------------------

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw opaque token, hex-encoded.
///
/// This is the value stored in the database as the session key.
pub fn hash_opaque_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Shortened form of a token, safe to put in logs.
pub fn token_fingerprint(raw: &str) -> String {
    hash_opaque_token(raw)[..12].to_string()
}
