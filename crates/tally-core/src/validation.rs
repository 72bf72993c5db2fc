//! # Validation Module
//!
//! Input checks shared by the sale, till and reconciliation engines.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (tally-api)                                              │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + tender/till rules                              │
//! │  └── Quantities, ids, free-text lengths, report filters                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (current_stock >= 0), CHECK (amount > 0)                    │
//! │  ├── UNIQUE one open shift                                             │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_NOTES_LEN, MAX_PAGE_LIMIT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required identifier (product, payment method, shift).
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_id;
///
/// assert!(validate_id("product_id", "p-1").is_ok());
/// assert!(validate_id("product_id", "   ").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Trims optional free text; blank becomes `None`.
///
/// Used for notes, customer names and payment reference numbers.
pub fn normalize_text(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(value.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale quantity: positive, at most [`MAX_ITEM_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a money input: not negative, at most [`MAX_AMOUNT_CENTS`].
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_amount;
///
/// assert!(validate_amount("unit_price", Money::from_cents(10_000)).is_ok());
/// assert!(validate_amount("unit_price", Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(amount_out_of_range(field));
    }

    Ok(())
}

/// Error for a money value, or a sum of them, outside `0..=MAX_AMOUNT_CENTS`.
pub fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
}

/// Validates pagination for list endpoints.
///
/// ## Rules
/// - `skip` must not be negative
/// - `limit` must be in `1..=MAX_PAGE_LIMIT`
pub fn validate_page(skip: i64, limit: i64) -> ValidationResult<()> {
    if skip < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "skip".to_string(),
        });
    }

    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT,
        });
    }

    Ok(())
}

/// Validates an optional `[start, end]` report window (inclusive days).
pub fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ValidationResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::InvalidFormat {
            field: "start_date".to_string(),
            reason: "must not be after end_date".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("amount", Money::zero()).is_ok());
        assert!(validate_amount("amount", Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());
        assert!(matches!(
            validate_amount("amount", Money::from_cents(-1)),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(matches!(
            validate_amount("amount", Money::from_cents(MAX_AMOUNT_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("notes", None).unwrap(), None);
        assert_eq!(normalize_text("notes", Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_text("customer_name", Some("  John ")).unwrap().as_deref(),
            Some("John")
        );

        let long = "x".repeat(MAX_NOTES_LEN + 1);
        assert!(matches!(
            normalize_text("notes", Some(&long)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(0, 100).is_ok());
        assert!(validate_page(-1, 100).is_err());
        assert!(validate_page(0, 0).is_err());
        assert!(validate_page(0, MAX_PAGE_LIMIT + 1).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(validate_date_range(Some(day), Some(day)).is_ok());
        assert!(validate_date_range(None, Some(day)).is_ok());
        assert!(validate_date_range(Some(day), day.checked_sub_days(Days::new(1))).is_err());
    }
}
