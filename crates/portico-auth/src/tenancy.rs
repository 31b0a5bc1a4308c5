//! Tenant Resolver and Fetcher.
//!
//! [`TenantDirectory`] is the capability the request pipeline depends on:
//! map a `Host` header to a slug, then a slug to a live tenant. The
//! production implementation is subdomain-based ([`SubdomainDirectory`]);
//! tests can substitute a fixed map.

use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::tenant::Tenant;
use portico_core::repository::TenantRepository;
use thiserror::Error;

/// The host is neither the root domain nor one of its subdomains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host {host:?} is not served by this deployment")]
pub struct DomainMismatch {
    pub host: String,
}

pub trait TenantDirectory: Send + Sync {
    /// `Ok(None)` for a root request, `Ok(Some(slug))` for a tenant request.
    fn resolve(&self, host: &str) -> Result<Option<String>, DomainMismatch>;

    /// Load a live tenant. Unknown, deactivated and deleted tenants are
    /// all `Ok(None)`.
    fn fetch(&self, slug: &str) -> impl Future<Output = PorticoResult<Option<Tenant>>> + Send;
}

/// Resolve `host` against `root_domain`.
///
/// Accepts the root itself and `www.<root>` as root requests, and
/// `<label>.<root>` as a tenant request. The slug is lowercased but not
/// otherwise validated. Anything else, including hosts that merely end
/// with the root string, is a [`DomainMismatch`].
pub fn resolve_host(root_domain: &str, host: &str) -> Result<Option<String>, DomainMismatch> {
    let mismatch = || DomainMismatch {
        host: host.to_string(),
    };

    let host = strip_port(host).to_ascii_lowercase();
    let root = root_domain.to_ascii_lowercase();
    if host.is_empty() || root.is_empty() {
        return Err(mismatch());
    }

    if host == root || host.strip_prefix("www.") == Some(root.as_str()) {
        return Ok(None);
    }

    match host.strip_suffix(root.as_str()).and_then(|h| h.strip_suffix('.')) {
        Some(slug) if !slug.is_empty() => Ok(Some(slug.to_string())),
        _ => Err(mismatch()),
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Subdomain-based directory backed by a [`TenantRepository`].
#[derive(Clone)]
pub struct SubdomainDirectory<T: TenantRepository> {
    root_domain: String,
    tenants: T,
}

impl<T: TenantRepository> SubdomainDirectory<T> {
    pub fn new(root_domain: impl Into<String>, tenants: T) -> Self {
        Self {
            root_domain: root_domain.into(),
            tenants,
        }
    }
}

impl<T: TenantRepository> TenantDirectory for SubdomainDirectory<T> {
    fn resolve(&self, host: &str) -> Result<Option<String>, DomainMismatch> {
        resolve_host(&self.root_domain, host)
    }

    async fn fetch(&self, slug: &str) -> PorticoResult<Option<Tenant>> {
        match self.tenants.get_active_by_slug(slug).await {
            Ok(tenant) => Ok(Some(tenant).filter(Tenant::is_live)),
            Err(PorticoError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
