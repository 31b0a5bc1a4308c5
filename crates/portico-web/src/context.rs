//! The per-request security context produced by the pipeline.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use portico_core::models::tenant::Tenant;
use portico_core::models::user::User;

use crate::error::WebError;

/// What the pipeline established about a request. Built once, then only
/// read; handlers receive it as an extractor.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    tenant: Option<Tenant>,
    user: Option<User>,
    csrf_token: String,
    lang: String,
}

impl SecurityContext {
    pub fn new(
        tenant: Option<Tenant>,
        user: Option<User>,
        csrf_token: String,
        lang: String,
    ) -> Self {
        Self {
            tenant,
            user,
            csrf_token,
            lang,
        }
    }

    /// `None` on the root domain.
    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.tenant.is_none()
    }

    /// `None` for anonymous requests.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// The tenant, or 404 for a root request.
    pub fn require_tenant(&self) -> Result<&Tenant, WebError> {
        self.tenant().ok_or(WebError::NotFound)
    }

    /// Unit success on the root domain, 404 on a tenant.
    pub fn require_root(&self) -> Result<(), WebError> {
        if self.is_root() {
            Ok(())
        } else {
            Err(WebError::NotFound)
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SecurityContext {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .ok_or_else(|| WebError::Internal("route mounted outside the security pipeline".into()))
    }
}
