//! Error types for the HTTP API.
//!
//! Every failure leaves the server as `{"code": "...", "message": "..."}`
//! with a status chosen from the error's [`ErrorKind`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use tally_core::{CoreError, ErrorKind};
use tally_db::DbError;

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Logs `detail` and hides it from the client.
    pub fn internal(detail: impl Into<String>) -> Self {
        error!(detail = %detail.into(), "Request failed with an internal error");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            code: self.code,
            message: &self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match (&err, err.kind()) {
            (CoreError::Validation(_), _) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, kind) => status_for(kind),
        };
        ApiError::new(status, core_code(&err), err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            DbError::UniqueViolation { .. } => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", err.to_string())
            }
            DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "CONSTRAINT_VIOLATION", err.to_string())
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::TransactionFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn core_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::TillLocked => "TILL_LOCKED",
        CoreError::Forbidden { .. } => "FORBIDDEN",
        CoreError::NotFound { .. } => "NOT_FOUND",
        CoreError::Inactive { .. } => "INACTIVE",
        CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
        CoreError::Underpayment { .. } => "UNDERPAYMENT",
        CoreError::ExcessiveOverpayment { .. } => "EXCESSIVE_OVERPAYMENT",
        CoreError::TotalMismatch { .. } => "TOTAL_MISMATCH",
        CoreError::NoPaymentMethodAvailable => "NO_PAYMENT_METHOD_AVAILABLE",
        CoreError::AlreadyOpen => "ALREADY_OPEN",
        CoreError::ShiftTypeMismatch { .. } => "SHIFT_TYPE_MISMATCH",
        CoreError::OpeningBalanceRequired => "OPENING_BALANCE_REQUIRED",
        CoreError::NoOpenTill => "NO_OPEN_TILL",
        CoreError::ShiftTooLong { .. } => "SHIFT_TOO_LONG",
        CoreError::NotClosed => "NOT_CLOSED",
        CoreError::AlreadyReconciled => "ALREADY_RECONCILED",
        CoreError::NoClosedShift => "NO_CLOSED_SHIFT",
        CoreError::AlreadyVoided(_) => "ALREADY_VOIDED",
        CoreError::Validation(_) => "VALIDATION_ERROR",
    }
}
