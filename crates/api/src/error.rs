//! JSON error responses.
//!
//! Every handler failure becomes `{ "error": CODE, "message": text }` with the
//! status code of the underlying domain error. Retryable conflicts also carry
//! a `Retry-After` header.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tally_core::ledger::LedgerError;
use tally_db::{AccountError, UserError};
use tally_shared::AppError;
use tracing::{error, warn};

/// An error returned from a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: StatusCode,
    /// Machine-readable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Whether the same request may succeed if sent again.
    pub retryable: bool,
}

impl ApiError {
    /// Creates an error from its parts.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a 400 error.
    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    fn from_parts(status: u16, code: &'static str, message: String) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            code,
            message,
            retryable: false,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let retryable = err.is_retryable();
        Self {
            retryable,
            ..Self::from_parts(err.http_status_code(), err.error_code(), err.to_string())
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        Self::from_parts(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        AppError::from(err).into()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::from_parts(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request("INVALID_PATH_PARAMETER", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("INVALID_QUERY", rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "INVALID_BODY", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, code = self.code, message = %self.message, "request failed");
        } else {
            warn!(status = %self.status, code = self.code, message = %self.message, "request rejected");
        }
        let body = Json(json!({
            "error": self.code,
            "message": self.message,
        }));
        if self.retryable {
            (self.status, [(header::RETRY_AFTER, "1")], body).into_response()
        } else {
            (self.status, body).into_response()
        }
    }
}
