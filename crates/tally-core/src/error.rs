//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Taxonomy every error is classified into        │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Persistence failures, wraps CoreError          │
//! │                                                                         │
//! │  tally-api errors                                                      │
//! │  └── ApiError         - What HTTP clients see (status + code)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::till::ShiftType;

// =============================================================================
// Error Kind
// =============================================================================

/// Classification shared by every error the engine can return.
///
/// ```text
/// Validation          → caller fixes the input and retries
/// Conflict            → retry after the conflicting state changes
/// Authorization       → retry only with different credentials
/// NotFound            → referenced entity is missing
/// TransactionFailure  → persistence failed, everything was rolled back
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authorization,
    NotFound,
    TransactionFailure,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the sale, till and reconciliation rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No till shift is open, so the POS refuses to sell.
    #[error("POS is locked: no till shift is open")]
    TillLocked,

    /// The caller lacks the role or ownership the operation needs.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A referenced entity exists but is not usable (inactive product or method).
    #[error("{entity} {id} is not active")]
    Inactive { entity: &'static str, id: String },

    /// Selling more than the product has on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell qty 11 of a product with stock 10
    ///      │
    ///      ▼
    /// InsufficientStock { available: 10, requested: 11 }
    ///      │
    ///      ▼
    /// Nothing written, stock stays at 10
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Payments fall short of the total and there is no customer to carry a debt.
    #[error("Underpayment: total {total}, paid {paid}")]
    Underpayment { total: Money, paid: Money },

    /// Payments exceed the total by more than the allowed ratio.
    #[error("Overpayment too large: total {total}, paid {paid} (max {max_percent}% over)")]
    ExcessiveOverpayment {
        total: Money,
        paid: Money,
        max_percent: u32,
    },

    /// The sale total does not match quantity times unit price.
    #[error("Total {total} does not match quantity x unit price ({expected})")]
    TotalMismatch { total: Money, expected: Money },

    /// No payment method could be resolved as the sale's primary method.
    #[error("No active payment method is available")]
    NoPaymentMethodAvailable,

    /// A till shift is already open.
    #[error("A till shift is already open")]
    AlreadyOpen,

    /// The requested shift type does not alternate with the previous shift.
    #[error("Shift type must be {expected} (previous shift was {previous}), got {requested}")]
    ShiftTypeMismatch {
        previous: ShiftType,
        expected: ShiftType,
        requested: ShiftType,
    },

    /// The previous shift is unreconciled, so a handed-over opening balance is required.
    #[error("Previous shift is not reconciled: a positive opening balance is required")]
    OpeningBalanceRequired,

    /// No shift is open to close.
    #[error("No till shift is open")]
    NoOpenTill,

    /// The shift ran past the maximum allowed duration.
    #[error("Shift has been open for {hours} hours (max {max_hours})")]
    ShiftTooLong { hours: i64, max_hours: i64 },

    /// Reconciliation requested for a shift that is still open.
    #[error("Cannot reconcile an open shift: close it first")]
    NotClosed,

    /// The shift was already reconciled.
    #[error("Shift has already been reconciled")]
    AlreadyReconciled,

    /// No closed shift exists to reconcile.
    #[error("No closed shift available for reconciliation")]
    NoClosedShift,

    /// The sale was already voided.
    #[error("Sale {0} is already voided")]
    AlreadyVoided(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::Forbidden`].
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TillLocked | CoreError::Forbidden { .. } => ErrorKind::Authorization,

            CoreError::NotFound { .. } => ErrorKind::NotFound,

            CoreError::Inactive { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::AlreadyOpen
            | CoreError::ShiftTypeMismatch { .. }
            | CoreError::NoOpenTill
            | CoreError::ShiftTooLong { .. }
            | CoreError::NotClosed
            | CoreError::AlreadyReconciled
            | CoreError::NoClosedShift
            | CoreError::AlreadyVoided(_)
            | CoreError::NoPaymentMethodAvailable => ErrorKind::Conflict,

            CoreError::Underpayment { .. }
            | CoreError::ExcessiveOverpayment { .. }
            | CoreError::TotalMismatch { .. }
            | CoreError::OpeningBalanceRequired
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, bad decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 10,
            requested: 11,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 10, requested 11"
        );

        let err = CoreError::ShiftTypeMismatch {
            previous: ShiftType::Day,
            expected: ShiftType::Night,
            requested: ShiftType::Day,
        };
        assert_eq!(
            err.to_string(),
            "Shift type must be night (previous shift was day), got day"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::TillLocked.kind(), ErrorKind::Authorization);
        assert_eq!(CoreError::AlreadyOpen.kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::Underpayment {
                total: Money::from_cents(100),
                paid: Money::zero()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(CoreError::forbidden("nope").kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "product_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
