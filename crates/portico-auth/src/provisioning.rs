//! Provisioning State Machine: turn a followed signup link into accounts.
//!
//! ```text
//! decode ──invalid──▶ Rejected(InvalidToken)
//!   │
//! lookup pending ──missing──▶ Rejected(NotFound)
//!   │
//! claims/scope check ──mismatch──▶ Rejected(InvalidToken)
//!   │
//! store transaction ──conflict──▶ consume token ▶ Rejected(AlreadyRegistered | SubdomainTaken)
//!   │            └────store error──▶ Rejected(InternalError), pending row intact
//!   ▼
//! Confirmed
//! ```
//!
//! Consuming the token on a business rejection takes two steps. The store
//! transaction rolls back as a whole, then the pending row is deleted on
//! its own. If that delete fails the outcome is `InternalError` and the
//! row stays, so a retry reaches the same rejection again.
//!
//! A member link followed on the wrong tenant is refused as
//! `InvalidToken` before any duplicate check, and the token survives.

use portico_core::error::PorticoError;
use portico_core::models::pending_signup::{PendingSignup, SignupKind};
use portico_core::models::provisioning::{ProvisionConflict, ProvisionError, ProvisionPlan};
use portico_core::models::tenant::{CreateTenant, Tenant};
use portico_core::models::user::NewAccount;
use portico_core::repository::{PendingSignupRepository, ProvisioningStore};
use portico_core::validate::{is_valid_slug, slugify};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::token::{SignupClaims, TokenCodec, token_fingerprint};

/// Why a confirmation did not create anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidToken,
    /// Never issued, expired, or already used. Indistinguishable by design.
    NotFound,
    AlreadyRegistered,
    SubdomainTaken,
    InternalError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::NotFound => "not_found",
            RejectReason::AlreadyRegistered => "already_registered",
            RejectReason::SubdomainTaken => "subdomain_taken",
            RejectReason::InternalError => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Confirmed { tenant_id: Uuid, user_id: Uuid },
    Rejected(RejectReason),
}

pub struct ProvisioningService<P: PendingSignupRepository, S: ProvisioningStore> {
    codec: TokenCodec,
    pending: P,
    store: S,
}

impl<P: PendingSignupRepository, S: ProvisioningStore> ProvisioningService<P, S> {
    pub fn new(codec: TokenCodec, pending: P, store: S) -> Self {
        Self {
            codec,
            pending,
            store,
        }
    }

    /// Consume a signup token.
    ///
    /// `request_tenant` is the tenant the confirming request resolved to
    /// (`None` on the root domain). Organization signups must be confirmed
    /// on the root domain; member signups on their own tenant.
    pub async fn confirm(
        &self,
        token: &str,
        request_tenant: Option<&Tenant>,
    ) -> ProvisionOutcome {
        let fingerprint = token_fingerprint(token);

        let Ok(claims) = self.codec.decode_signup(token) else {
            info!(token = %fingerprint, "confirmation with invalid token");
            return ProvisionOutcome::Rejected(RejectReason::InvalidToken);
        };

        let pending = match self.pending.get_by_token(token).await {
            Ok(p) => p,
            Err(PorticoError::NotFound { .. }) => {
                info!(token = %fingerprint, "confirmation for unknown or consumed signup");
                return ProvisionOutcome::Rejected(RejectReason::NotFound);
            }
            Err(e) => {
                error!(error = %e, "pending signup lookup failed");
                return ProvisionOutcome::Rejected(RejectReason::InternalError);
            }
        };

        let plan = match plan_for(&claims, pending, request_tenant) {
            Ok(plan) => plan,
            Err(reason) => {
                warn!(token = %fingerprint, reason = reason.as_str(), "confirmation refused");
                return ProvisionOutcome::Rejected(reason);
            }
        };

        match self.store.provision(plan).await {
            Ok(account) => {
                info!(
                    tenant_id = %account.tenant_id,
                    user_id = %account.user_id,
                    "signup confirmed"
                );
                ProvisionOutcome::Confirmed {
                    tenant_id: account.tenant_id,
                    user_id: account.user_id,
                }
            }
            Err(ProvisionError::Conflict(ProvisionConflict::PendingConsumed)) => {
                ProvisionOutcome::Rejected(RejectReason::NotFound)
            }
            Err(ProvisionError::Conflict(conflict)) => {
                let reason = match conflict {
                    ProvisionConflict::SlugTaken => RejectReason::SubdomainTaken,
                    _ => RejectReason::AlreadyRegistered,
                };
                self.consume(token, reason).await
            }
            Err(ProvisionError::Store(e)) => {
                error!(error = %e, token = %fingerprint, "provisioning transaction failed");
                ProvisionOutcome::Rejected(RejectReason::InternalError)
            }
        }
    }

    /// Burn the token after a business rejection so the link cannot be
    /// replayed.
    async fn consume(&self, token: &str, reason: RejectReason) -> ProvisionOutcome {
        match self.pending.delete_by_token(token).await {
            Ok(_) => {
                info!(reason = reason.as_str(), "signup rejected, token consumed");
                ProvisionOutcome::Rejected(reason)
            }
            Err(e) => {
                error!(error = %e, "failed to consume rejected signup token");
                ProvisionOutcome::Rejected(RejectReason::InternalError)
            }
        }
    }
}

/// Cross-check the decoded claims against the stored row and the
/// request scope, and build the store plan.
fn plan_for(
    claims: &SignupClaims,
    pending: PendingSignup,
    request_tenant: Option<&Tenant>,
) -> Result<ProvisionPlan, RejectReason> {
    if claims.email() != pending.email {
        return Err(RejectReason::InvalidToken);
    }

    match (claims, pending.kind) {
        (
            SignupClaims::Tenant { org_name, .. },
            SignupKind::Tenant {
                org_name: stored_org,
            },
        ) if *org_name == stored_org => {
            if request_tenant.is_some() {
                return Err(RejectReason::InvalidToken);
            }
            let slug = slugify(org_name);
            if !is_valid_slug(&slug) {
                return Err(RejectReason::InvalidToken);
            }
            Ok(ProvisionPlan::Tenant {
                token: pending.token,
                tenant: CreateTenant {
                    slug,
                    name: stored_org,
                    email: pending.email.clone(),
                },
                owner: NewAccount {
                    email: pending.email,
                    password_hash: pending.password_hash,
                },
            })
        }
        (
            SignupClaims::Member { tenant_id, .. },
            SignupKind::User {
                tenant_id: stored_tenant,
            },
        ) if *tenant_id == stored_tenant => match request_tenant {
            Some(tenant) if tenant.id == stored_tenant => Ok(ProvisionPlan::Member {
                token: pending.token,
                tenant_id: stored_tenant,
                member: NewAccount {
                    email: pending.email,
                    password_hash: pending.password_hash,
                },
            }),
            _ => Err(RejectReason::InvalidToken),
        },
        _ => Err(RejectReason::InvalidToken),
    }
}
