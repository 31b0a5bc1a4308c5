//! Signup issuance: validate a signup form, park it as a pending row
//! and hand back the emailed verification link.
//!
//! Nothing here creates tenants or users; that happens only when the
//! link is followed (see [`crate::provisioning`]).

use chrono::{DateTime, Utc};
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::pending_signup::{CreatePendingSignup, SignupKind};
use portico_core::models::tenant::Tenant;
use portico_core::repository::{PendingSignupRepository, TenantRepository, UserRepository};
use portico_core::validate::{is_valid_email, is_valid_slug, normalize_email, slugify};
use tracing::{debug, info};

use crate::config::{self, AuthConfig};
use crate::password;
use crate::token::{SignupClaims, TokenCodec, token_fingerprint};

/// Where verification links point.
#[derive(Debug, Clone)]
pub struct LinkBase {
    /// `https` in production.
    pub scheme: String,
    pub root_domain: String,
}

impl LinkBase {
    fn root_link(&self, path: &str, token: &str) -> String {
        format!("{}://{}{path}?token={token}", self.scheme, self.root_domain)
    }

    fn tenant_link(&self, slug: &str, path: &str, token: &str) -> String {
        format!(
            "{}://{slug}.{}{path}?token={token}",
            self.scheme, self.root_domain
        )
    }
}

/// Root-domain signup form: a new organization and its owner.
#[derive(Debug)]
pub struct EnrollInput {
    pub email: String,
    pub org_name: String,
    pub password: String,
}

/// Tenant-domain signup form: a new member.
#[derive(Debug)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
}

/// An issued signup. `link` is what would be emailed.
#[derive(Debug, Clone)]
pub struct IssuedSignup {
    pub email: String,
    pub link: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SignupService<T, U, P>
where
    T: TenantRepository,
    U: UserRepository,
    P: PendingSignupRepository,
{
    tenants: T,
    users: U,
    pending: P,
    codec: TokenCodec,
    links: LinkBase,
    config: AuthConfig,
}

impl<T, U, P> SignupService<T, U, P>
where
    T: TenantRepository,
    U: UserRepository,
    P: PendingSignupRepository,
{
    pub fn new(
        tenants: T,
        users: U,
        pending: P,
        codec: TokenCodec,
        links: LinkBase,
        config: AuthConfig,
    ) -> Self {
        Self {
            tenants,
            users,
            pending,
            codec,
            links,
            config,
        }
    }

    /// Organization signup on the root domain.
    pub async fn enroll(&self, input: EnrollInput) -> PorticoResult<IssuedSignup> {
        let email = self.checked_email(&input.email)?;
        let org_name = input.org_name.trim().to_string();
        if org_name.is_empty() {
            return Err(PorticoError::validation("organization name is required"));
        }
        let slug = slugify(&org_name);
        if !is_valid_slug(&slug) {
            return Err(PorticoError::validation(format!(
                "organization name does not give a valid subdomain: {slug:?}"
            )));
        }
        password::check_policy(&input.password, self.config.min_password_length)?;

        if self.tenants.slug_or_email_taken(&slug, &email).await? {
            return Err(PorticoError::AlreadyExists {
                entity: "tenant".into(),
            });
        }

        let claims = SignupClaims::Tenant {
            email: email.clone(),
            org_name: org_name.clone(),
        };
        let (token, expires_at) = self
            .issue(&claims, SignupKind::Tenant { org_name }, &input.password)
            .await?;

        let link = self.links.root_link("/verify", &token);
        info!(%slug, "organization signup pending");
        Ok(IssuedSignup {
            email,
            link,
            token,
            expires_at,
        })
    }

    /// Member signup on `tenant`'s subdomain.
    pub async fn register(
        &self,
        tenant: &Tenant,
        input: RegisterInput,
    ) -> PorticoResult<IssuedSignup> {
        let email = self.checked_email(&input.email)?;
        password::check_policy(&input.password, self.config.min_password_length)?;

        if self.users.email_registered(tenant.id, &email).await?
            || self.pending.exists_for_user(tenant.id, &email).await?
        {
            return Err(PorticoError::AlreadyExists {
                entity: "user".into(),
            });
        }

        let claims = SignupClaims::Member {
            email: email.clone(),
            tenant_id: tenant.id,
        };
        let (token, expires_at) = self
            .issue(
                &claims,
                SignupKind::User {
                    tenant_id: tenant.id,
                },
                &input.password,
            )
            .await?;

        let link = self.links.tenant_link(&tenant.slug, "/confirm", &token);
        info!(tenant = %tenant.slug, "member signup pending");
        Ok(IssuedSignup {
            email,
            link,
            token,
            expires_at,
        })
    }

    fn checked_email(&self, raw: &str) -> PorticoResult<String> {
        let email = normalize_email(raw);
        if !is_valid_email(&email) {
            return Err(PorticoError::validation("email address is malformed"));
        }
        Ok(email)
    }

    async fn issue(
        &self,
        claims: &SignupClaims,
        kind: SignupKind,
        password: &str,
    ) -> PorticoResult<(String, DateTime<Utc>)> {
        let expires_at = Utc::now() + config::lifetime(self.config.signup_token_lifetime_secs);
        let token = self.codec.encode_signup(claims, expires_at)?;
        let password_hash = password::hash_password(password, self.config.pepper.as_deref())?;

        self.pending
            .create(CreatePendingSignup {
                email: claims.email().to_string(),
                kind,
                password_hash,
                token: token.clone(),
                expires_at,
            })
            .await?;

        debug!(token = %token_fingerprint(&token), "pending signup stored");
        Ok((token, expires_at))
    }
}
