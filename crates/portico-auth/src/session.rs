//! Session Manager: opaque login sessions bound to one tenant.

use chrono::{DateTime, Duration, Utc};
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::session::{CreateSession, Session};
use portico_core::models::user::User;
use portico_core::repository::{SessionRepository, UserRepository};
use tracing::debug;
use uuid::Uuid;

use crate::config;
use crate::token;

/// A freshly minted session. `token` goes into the cookie and nowhere else.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A session that passed validation, joined to its user.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session: Session,
    pub user: User,
}

impl ActiveSession {
    pub fn tenant_id(&self) -> Uuid {
        self.session.tenant_id
    }
}

pub struct SessionManager<S: SessionRepository, U: UserRepository> {
    sessions: S,
    users: U,
    lifetime: Duration,
}

impl<S: SessionRepository, U: UserRepository> SessionManager<S, U> {
    pub fn new(sessions: S, users: U, lifetime_secs: u64) -> Self {
        Self {
            sessions,
            users,
            lifetime: config::lifetime(lifetime_secs),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Mint a 256-bit random token and persist its digest.
    pub async fn create(&self, user_id: Uuid, tenant_id: Uuid) -> PorticoResult<IssuedSession> {
        let raw = token::generate_opaque_token();
        let expires_at = Utc::now() + self.lifetime;

        self.sessions
            .create(CreateSession {
                token_hash: token::hash_opaque_token(&raw),
                tenant_id,
                user_id,
                expires_at,
            })
            .await?;

        debug!(%user_id, %tenant_id, session = %token::token_fingerprint(&raw), "session created");
        Ok(IssuedSession {
            token: raw,
            expires_at,
        })
    }

    /// Delete the session behind a raw token (logout).
    pub async fn revoke(&self, raw: &str) -> PorticoResult<()> {
        if raw.is_empty() {
            return Ok(());
        }
        self.sessions.delete(&token::hash_opaque_token(raw)).await?;
        debug!(session = %token::token_fingerprint(raw), "session revoked");
        Ok(())
    }

    /// Look up a session token. Missing, expired and orphaned sessions
    /// are `Ok(None)`; only store failures are errors.
    ///
    /// Tenant binding is not checked here: the caller compares
    /// [`ActiveSession::tenant_id`] with the request's tenant.
    pub async fn validate(&self, raw: &str) -> PorticoResult<Option<ActiveSession>> {
        if raw.is_empty() {
            return Ok(None);
        }

        let session = match self
            .sessions
            .get_active(&token::hash_opaque_token(raw))
            .await
        {
            Ok(s) => s,
            Err(PorticoError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        // Re-checked against this process clock.
        if session.expires_at <= Utc::now() {
            return Ok(None);
        }

        match self.users.get_by_id(session.tenant_id, session.user_id).await {
            Ok(user) => Ok(Some(ActiveSession { session, user })),
            Err(PorticoError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
