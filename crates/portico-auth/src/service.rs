//! Authentication service: login orchestration.

use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::tenant::Tenant;
use portico_core::repository::{SessionRepository, UserRepository};
use portico_core::validate::normalize_email;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::session::{IssuedSession, SessionManager};

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    pub user_id: Uuid,
    /// Raw session token for the cookie; only its digest is stored.
    pub session: IssuedSession,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U: UserRepository, S: SessionRepository> {
    user_repo: U,
    sessions: SessionManager<S, U>,
    config: AuthConfig,
}

impl<U: UserRepository, S: SessionRepository> AuthService<U, S> {
    pub fn new(user_repo: U, sessions: SessionManager<S, U>, config: AuthConfig) -> Self {
        Self {
            user_repo,
            sessions,
            config,
        }
    }

    pub fn sessions(&self) -> &SessionManager<S, U> {
        &self.sessions
    }

    /// Authenticate a verified user of `tenant` and open a session.
    ///
    /// Unknown email and wrong password both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, tenant: &Tenant, input: LoginInput) -> PorticoResult<LoginOutput> {
        // 1. The tenant must accept sign-ins at all.
        if !tenant.allow_signins {
            return Err(AuthError::SigninsDisabled.into());
        }

        // 2. Look up a verified user within this tenant only.
        let email = normalize_email(&input.email);
        let user = match self.user_repo.get_verified_by_email(tenant.id, &email).await {
            Ok(u) => u,
            Err(PorticoError::NotFound { .. }) => {
                debug!(tenant = %tenant.slug, "login for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 3. Verify password.
        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            debug!(tenant = %tenant.slug, user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 4. Open a session bound to this tenant.
        let session = self.sessions.create(user.id, tenant.id).await?;
        info!(tenant = %tenant.slug, user_id = %user.id, "user logged in");

        Ok(LoginOutput {
            user_id: user.id,
            session,
        })
    }
}
