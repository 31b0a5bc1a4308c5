//! Request Security Pipeline.
//!
//! Every request passes, in order, through:
//!
//! 1. tenant resolution from the `Host` header (mismatch: 404)
//! 2. tenant fetch for subdomain requests (unknown or disabled: 404)
//! 3. session validation, including the tenant binding check
//! 4. CSRF ensure, and verify on state-changing methods (mismatch: 403)
//! 5. language selection
//!
//! and reaches its handler with a [`SecurityContext`] in its extensions.
//! The whole chain, handler included, runs under the configured request
//! deadline.

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method,
        header::{CONTENT_TYPE, HOST, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use portico_auth::{ActiveSession, TenantDirectory, csrf};
use portico_core::models::tenant::Tenant;
use portico_core::models::user::User;
use tracing::{debug, warn};

use crate::config::WebConfig;
use crate::context::SecurityContext;
use crate::cookies;
use crate::error::WebError;
use crate::lang;
use crate::state::AppState;

/// Middleware state: the tenant directory plus the shared services.
pub struct Pipeline<D: TenantDirectory> {
    directory: D,
    state: Arc<AppState>,
}

impl<D: TenantDirectory> Pipeline<D> {
    pub fn new(directory: D, state: Arc<AppState>) -> Self {
        Self { directory, state }
    }
}

pub async fn security_pipeline<D: TenantDirectory + 'static>(
    State(pipeline): State<Arc<Pipeline<D>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let deadline = pipeline.state.config.request_timeout;
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(deadline, run(&pipeline, request, next)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%method, %path, ?deadline, "request deadline exceeded");
            WebError::Timeout.into_response()
        }
    }
}

async fn run<D: TenantDirectory>(
    pipeline: &Pipeline<D>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = &pipeline.state.config;

    let tenant = match resolve_tenant(&pipeline.directory, request.headers()).await {
        Ok(tenant) => tenant,
        Err(e) => return e.into_response(),
    };

    let mut set_cookies = Vec::new();

    let user = match authenticate(&pipeline.state, request.headers(), tenant.as_ref()).await {
        Ok(SessionCheck::Anonymous) => None,
        Ok(SessionCheck::Valid(user)) => Some(*user),
        Ok(SessionCheck::Invalid) => {
            set_cookies.push(cookies::clear_session(config));
            None
        }
        Err(e) => return e.into_response(),
    };

    let (csrf_token, minted) = match cookies::read(request.headers(), &config.csrf_cookie_name) {
        Some(existing) if csrf::is_well_formed(existing) => (existing.to_string(), false),
        _ => (csrf::generate_csrf_token(), true),
    };
    if minted {
        set_cookies.push(cookies::csrf(config, &csrf_token));
    }

    if is_state_changing(request.method()) {
        let (submitted, rebuilt) = match submitted_csrf_token(request, config).await {
            Ok(found) => found,
            Err(e) => return with_cookies(e.into_response(), &set_cookies),
        };
        request = rebuilt;

        let valid = !minted
            && submitted
                .as_deref()
                .is_some_and(|s| csrf::verify_csrf_token(&csrf_token, s));
        if !valid {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                had_cookie = !minted,
                had_submission = submitted.is_some(),
                "CSRF verification failed"
            );
            return with_cookies(WebError::CsrfRejected.into_response(), &set_cookies);
        }
    }

    let lang = lang::resolve(request.headers(), config);

    request
        .extensions_mut()
        .insert(SecurityContext::new(tenant, user, csrf_token, lang));

    with_cookies(next.run(request).await, &set_cookies)
}

fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(HOST).and_then(|h| h.to_str().ok())
}

async fn resolve_tenant<D: TenantDirectory>(
    directory: &D,
    headers: &HeaderMap,
) -> Result<Option<Tenant>, WebError> {
    let Some(host) = request_host(headers) else {
        debug!("request without Host header");
        return Err(WebError::NotFound);
    };

    let slug = directory.resolve(host).map_err(|e| {
        debug!(host = %e.host, "host outside root domain");
        WebError::from(e)
    })?;

    let Some(slug) = slug else {
        return Ok(None);
    };
    match directory.fetch(&slug).await? {
        Some(tenant) => Ok(Some(tenant)),
        None => {
            debug!(tenant = %slug, "unknown or disabled tenant");
            Err(WebError::NotFound)
        }
    }
}

enum SessionCheck {
    /// No session cookie at all.
    Anonymous,
    Valid(Box<User>),
    /// A cookie was sent but does not authenticate this request; it is
    /// cleared and the request continues anonymously.
    Invalid,
}

async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    tenant: Option<&Tenant>,
) -> Result<SessionCheck, WebError> {
    let Some(raw) = cookies::read(headers, &state.config.session_cookie_name) else {
        return Ok(SessionCheck::Anonymous);
    };

    match state.auth.sessions().validate(raw).await? {
        Some(active) if bound_to(&active, tenant) => Ok(SessionCheck::Valid(Box::new(active.user))),
        Some(active) => {
            warn!(
                session_tenant = %active.tenant_id(),
                request_tenant = tenant.map(|t| t.slug.as_str()).unwrap_or(""),
                "session presented on a foreign tenant"
            );
            Ok(SessionCheck::Invalid)
        }
        None => {
            debug!("stale session cookie");
            Ok(SessionCheck::Invalid)
        }
    }
}

/// Sessions are bound to the tenant they were minted on. Root requests
/// carry no tenant to compare against.
fn bound_to(active: &ActiveSession, tenant: Option<&Tenant>) -> bool {
    tenant.is_none_or(|t| t.id == active.tenant_id())
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// The submitted CSRF token: the header if present, else the form field
/// of an urlencoded body. Reading the body consumes it, so the request is
/// rebuilt around the buffered bytes.
async fn submitted_csrf_token(
    request: Request<Body>,
    config: &WebConfig,
) -> Result<(Option<String>, Request<Body>), WebError> {
    if let Some(header) = request
        .headers()
        .get(config.csrf_header_name.as_str())
        .and_then(|v| v.to_str().ok())
    {
        let token = header.to_string();
        return Ok((Some(token), request));
    }

    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Ok((None, request));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, config.form_body_limit)
        .await
        .map_err(|_| WebError::PayloadTooLarge)?;
    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == config.csrf_form_field.as_str())
        .map(|(_, value)| value.into_owned());

    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

fn with_cookies(mut response: Response, set_cookies: &[String]) -> Response {
    for cookie in set_cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => warn!("dropping unrepresentable Set-Cookie header"),
        }
    }
    response
}
