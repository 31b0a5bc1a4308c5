//! HTTP handlers.
//!
//! Rendering is out of scope: every page answers with a JSON view
//! document (`view`, `lang`, `csrf_token`, `data`) for an external
//! renderer. Scope rules (root-only, tenant-only) answer 404.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use portico_auth::{EnrollInput, LoginInput, ProvisionOutcome, RegisterInput, RejectReason};
use portico_core::error::PorticoError;
use portico_core::repository::MembershipRepository;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::context::SecurityContext;
use crate::cookies;
use crate::error::{WebError, WebResult};
use crate::state::AppState;

/// A named view plus the data a renderer needs for it.
#[derive(Debug, Serialize)]
pub struct View {
    pub view: &'static str,
    pub lang: String,
    pub csrf_token: String,
    pub data: Value,
}

impl View {
    pub fn new(view: &'static str, ctx: &SecurityContext, data: Value) -> Self {
        Self {
            view,
            lang: ctx.lang().to_string(),
            csrf_token: ctx.csrf_token().to_string(),
            data,
        }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

fn user_data(ctx: &SecurityContext) -> Value {
    match ctx.user() {
        Some(user) => json!({ "id": user.id, "email": user.email, "role": user.role }),
        None => Value::Null,
    }
}

/// Re-render a form with an error, or fall through to the generic error
/// body for anything that is not the submitter's fault.
fn form_error(view: &'static str, ctx: &SecurityContext, err: PorticoError) -> Response {
    let (status, error) = match &err {
        PorticoError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        PorticoError::AlreadyExists { .. } => {
            (StatusCode::CONFLICT, RejectReason::AlreadyRegistered.as_str().to_string())
        }
        _ => return WebError::from(err).into_response(),
    };
    (status, View::new(view, ctx, json!({ "error": error }))).into_response()
}

// ---------------------------------------------------------------------------
// Home
// ---------------------------------------------------------------------------

pub async fn home(ctx: SecurityContext) -> View {
    match ctx.tenant() {
        None => View::new("home", &ctx, json!({ "user": user_data(&ctx) })),
        Some(tenant) => {
            let data = json!({
                "tenant": { "slug": tenant.slug, "name": tenant.name },
                "user": user_data(&ctx),
            });
            View::new("tenant_home", &ctx, data)
        }
    }
}

// ---------------------------------------------------------------------------
// Signup issuance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EnrollForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub password: String,
}

pub async fn enroll_form(ctx: SecurityContext) -> WebResult<View> {
    ctx.require_root()?;
    Ok(View::new("enroll", &ctx, json!({})))
}

pub async fn enroll(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
    Form(form): Form<EnrollForm>,
) -> WebResult<Response> {
    ctx.require_root()?;

    let input = EnrollInput {
        email: form.email,
        org_name: form.org_name,
        password: form.password,
    };
    match state.signups.enroll(input).await {
        Ok(issued) => {
            debug!(target: "portico::outbox", to = %issued.email, link = %issued.link, "verification link");
            let data = json!({ "email": issued.email, "expires_at": issued.expires_at });
            Ok(View::new("enroll_sent", &ctx, data).into_response())
        }
        Err(e) => Ok(form_error("enroll", &ctx, e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register_form(ctx: SecurityContext) -> WebResult<View> {
    let tenant = ctx.require_tenant()?;
    let data = json!({ "tenant": { "slug": tenant.slug, "name": tenant.name } });
    Ok(View::new("register", &ctx, data))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
    Form(form): Form<RegisterForm>,
) -> WebResult<Response> {
    let tenant = ctx.require_tenant()?;

    let input = RegisterInput {
        email: form.email,
        password: form.password,
    };
    match state.signups.register(tenant, input).await {
        Ok(issued) => {
            debug!(target: "portico::outbox", to = %issued.email, link = %issued.link, "confirmation link");
            let data = json!({ "email": issued.email, "expires_at": issued.expires_at });
            Ok(View::new("register_sent", &ctx, data).into_response())
        }
        Err(e) => Ok(form_error("register", &ctx, e)),
    }
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

pub fn outcome_status(outcome: &ProvisionOutcome) -> StatusCode {
    match outcome {
        ProvisionOutcome::Confirmed { .. } => StatusCode::OK,
        ProvisionOutcome::Rejected(RejectReason::InvalidToken | RejectReason::NotFound) => {
            StatusCode::BAD_REQUEST
        }
        ProvisionOutcome::Rejected(
            RejectReason::AlreadyRegistered | RejectReason::SubdomainTaken,
        ) => StatusCode::CONFLICT,
        ProvisionOutcome::Rejected(RejectReason::InternalError) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn provision(
    view: &'static str,
    state: &AppState,
    ctx: &SecurityContext,
    token: &str,
) -> Response {
    let outcome = state.provisioning.confirm(token, ctx.tenant()).await;
    let data = match outcome {
        ProvisionOutcome::Confirmed { tenant_id, user_id } => json!({
            "outcome": "confirmed",
            "tenant_id": tenant_id,
            "user_id": user_id,
        }),
        ProvisionOutcome::Rejected(reason) => json!({ "outcome": reason.as_str() }),
    };
    (outcome_status(&outcome), View::new(view, ctx, data)).into_response()
}

/// Organization signup link, followed on the root domain.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
    Query(query): Query<TokenQuery>,
) -> Response {
    provision("verify", &state, &ctx, &query.token).await
}

/// Member signup link, followed on the tenant's subdomain.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
    Query(query): Query<TokenQuery>,
) -> Response {
    provision("confirm", &state, &ctx, &query.token).await
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_form(
    ctx: SecurityContext,
    Query(query): Query<LoginQuery>,
) -> WebResult<View> {
    let tenant = ctx.require_tenant()?;
    let data = json!({
        "tenant": { "slug": tenant.slug, "name": tenant.name },
        "error": query.error,
    });
    Ok(View::new("login", &ctx, data))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
    Form(form): Form<LoginForm>,
) -> WebResult<Response> {
    let tenant = ctx.require_tenant()?;

    let input = LoginInput {
        email: form.email,
        password: form.password,
    };
    match state.auth.login(tenant, input).await {
        Ok(output) => {
            let max_age = state.auth.sessions().lifetime().num_seconds();
            let cookie = cookies::session(&state.config, &output.session.token, max_age);
            Ok((
                AppendHeaders([(SET_COOKIE, cookie)]),
                Redirect::to("/dashboard"),
            )
                .into_response())
        }
        Err(PorticoError::AuthenticationFailed { .. }) => {
            let data = json!({
                "tenant": { "slug": tenant.slug, "name": tenant.name },
                "error": "invalid_credentials",
            });
            Ok((StatusCode::UNAUTHORIZED, View::new("login", &ctx, data)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
    headers: HeaderMap,
) -> Response {
    if let Some(user) = ctx.user() {
        let raw = cookies::read(&headers, &state.config.session_cookie_name).unwrap_or_default();
        match state.auth.sessions().revoke(raw).await {
            Ok(()) => info!(user_id = %user.id, "user logged out"),
            Err(e) => warn!(user_id = %user.id, error = %e, "session revocation failed"),
        }
    }
    (
        AppendHeaders([(SET_COOKIE, cookies::clear_session(&state.config))]),
        Redirect::to("/"),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    ctx: SecurityContext,
) -> WebResult<Response> {
    let Some(user) = ctx.user() else {
        return Ok(Redirect::to("/login?error=auth").into_response());
    };

    let membership = match state.memberships.get(user.tenant_id, user.id).await {
        Ok(m) if m.is_active => m,
        Ok(_) | Err(PorticoError::NotFound { .. }) => {
            debug!(user_id = %user.id, "no active membership for session user");
            return Ok(Redirect::to("/login?error=auth").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let data = json!({
        "user": user_data(&ctx),
        "tenant": ctx.tenant().map(|t| json!({ "slug": t.slug, "name": t.name })),
        "role": membership.role,
    });
    Ok(View::new("dashboard", &ctx, data).into_response())
}
