//! HTTP error type and its JSON rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portico_auth::DomainMismatch;
use portico_core::error::PorticoError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    /// Unknown host, unknown or disabled tenant, or a route used outside
    /// its scope. Always the same body so tenant existence does not leak.
    #[error("not found")]
    NotFound,

    #[error("CSRF token missing or invalid")]
    CsrfRejected,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("too many requests")]
    RateLimited,

    #[error("request deadline exceeded")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::CsrfRejected => StatusCode::FORBIDDEN,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebError::Conflict(_) => StatusCode::CONFLICT,
            WebError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            WebError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            WebError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WebError::NotFound => "not_found",
            WebError::CsrfRejected => "csrf_rejected",
            WebError::BadRequest(_) => "bad_request",
            WebError::Unauthorized(_) => "unauthorized",
            WebError::Conflict(_) => "conflict",
            WebError::PayloadTooLarge => "payload_too_large",
            WebError::RateLimited => "rate_limited",
            WebError::Timeout => "timeout",
            WebError::Internal(_) => "internal_error",
        }
    }
}

impl From<DomainMismatch> for WebError {
    fn from(_: DomainMismatch) -> Self {
        WebError::NotFound
    }
}

impl From<PorticoError> for WebError {
    fn from(err: PorticoError) -> Self {
        match err {
            PorticoError::NotFound { .. } => WebError::NotFound,
            PorticoError::AlreadyExists { entity } => {
                WebError::Conflict(format!("{entity} already exists"))
            }
            PorticoError::AuthenticationFailed { reason } => WebError::Unauthorized(reason),
            PorticoError::Validation { message } => WebError::BadRequest(message),
            PorticoError::Database(msg) | PorticoError::Crypto(msg) => WebError::Internal(msg),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            WebError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_mismatch_and_missing_tenant_look_alike() {
        let mismatch: WebError = DomainMismatch {
            host: "evil.example".into(),
        }
        .into();
        let missing: WebError = PorticoError::NotFound {
            entity: "tenant".into(),
            id: "ghost".into(),
        }
        .into();

        assert_eq!(mismatch.status(), StatusCode::NOT_FOUND);
        assert_eq!(mismatch.status(), missing.status());
        assert_eq!(mismatch.to_string(), missing.to_string());
    }

    #[test]
    fn store_failures_are_internal() {
        let err: WebError = PorticoError::Database("connection reset".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }

    #[test]
    fn timeout_is_service_unavailable() {
        assert_eq!(WebError::Timeout.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
