//! Shared application state.

use portico_auth::{
    AuthConfig, AuthService, LinkBase, ProvisioningService, SessionManager, SignupService,
    SubdomainDirectory, TokenCodec,
};
use portico_db::repository::{
    SurrealMembershipRepository, SurrealPendingSignupRepository, SurrealProvisioningStore,
    SurrealSessionRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::WebConfig;
use crate::rate_limit::RateLimiter;

pub type Db = Any;

pub type Auth = AuthService<SurrealUserRepository<Db>, SurrealSessionRepository<Db>>;
pub type Signups = SignupService<
    SurrealTenantRepository<Db>,
    SurrealUserRepository<Db>,
    SurrealPendingSignupRepository<Db>,
>;
pub type Provisioning =
    ProvisioningService<SurrealPendingSignupRepository<Db>, SurrealProvisioningStore<Db>>;
pub type Directory = SubdomainDirectory<SurrealTenantRepository<Db>>;

/// Services shared by every handler, wired to one SurrealDB client.
pub struct AppState {
    pub config: WebConfig,
    pub auth: Auth,
    pub signups: Signups,
    pub provisioning: Provisioning,
    pub memberships: SurrealMembershipRepository<Db>,
    pub tenants: SurrealTenantRepository<Db>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: Surreal<Db>, auth_config: AuthConfig, config: WebConfig) -> Self {
        let codec = TokenCodec::from_config(&auth_config);
        let links = LinkBase {
            scheme: config.link_scheme.clone(),
            root_domain: config.root_domain.clone(),
        };

        let sessions = SessionManager::new(
            SurrealSessionRepository::new(db.clone()),
            SurrealUserRepository::new(db.clone()),
            auth_config.session_lifetime_secs,
        );
        let auth = AuthService::new(
            SurrealUserRepository::new(db.clone()),
            sessions,
            auth_config.clone(),
        );
        let signups = SignupService::new(
            SurrealTenantRepository::new(db.clone()),
            SurrealUserRepository::new(db.clone()),
            SurrealPendingSignupRepository::new(db.clone()),
            codec.clone(),
            links,
            auth_config,
        );
        let provisioning = ProvisioningService::new(
            codec,
            SurrealPendingSignupRepository::new(db.clone()),
            SurrealProvisioningStore::new(db.clone()),
        );
        let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);

        Self {
            auth,
            signups,
            provisioning,
            memberships: SurrealMembershipRepository::new(db.clone()),
            tenants: SurrealTenantRepository::new(db),
            rate_limiter,
            config,
        }
    }

    /// The production tenant directory: subdomains of the root domain,
    /// backed by the tenant table.
    pub fn directory(&self) -> Directory {
        SubdomainDirectory::new(self.config.root_domain.clone(), self.tenants.clone())
    }
}
