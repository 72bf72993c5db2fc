//! # Tender Settlement
//!
//! Rules deciding whether a set of payments settles a sale.
//!
//! ## Decision Table
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  diff = Σ payments - total                                              │
//! │                                                                          │
//! │                     │ no customer              │ customer given          │
//! │  ───────────────────┼──────────────────────────┼──────────────────────── │
//! │  no payments        │ rejected (payments req.) │ full amount → Debt      │
//! │  diff < -0.01       │ Underpayment             │ shortfall → Debt        │
//! │  -0.01 ≤ diff ≤ 0.01│ accepted                 │ accepted (tiny debt if  │
//! │                     │                          │ paid < total)           │
//! │  diff > 0.01        │ accepted if ≤ 20% over   │ accepted if ≤ 20% over  │
//! │                     │ else ExcessiveOverpayment│ else ExcessiveOverpay.  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, MONEY_EPSILON};
use crate::validation::{amount_out_of_range, validate_amount};
use crate::types::PaymentMethod;

/// Maximum overpayment, in basis points of the sale total (2000 = 20%).
pub const MAX_OVERPAYMENT_BPS: u32 = 2000;

/// One payment a cashier entered for a split sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderLine {
    pub payment_method_id: String,
    pub amount: Money,
    pub reference_number: Option<String>,
}

/// Outcome of [`settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub total: Money,
    pub paid: Money,
    /// Amount the customer still owes. Zero unless a customer was named.
    pub shortfall: Money,
    /// Amount paid above the total (change due). Never negative.
    pub overpaid: Money,
}

impl Settlement {
    /// True when the shortfall must be booked as a debt.
    pub fn creates_debt(&self) -> bool {
        self.shortfall.is_positive()
    }
}

/// Checks a split-payment tender against the sale total.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::tender::settle;
///
/// let total = Money::from_cents(100_000);
/// let paid = [Money::from_cents(60_000), Money::from_cents(30_000)];
///
/// // With a customer the 100.00 gap becomes a debt
/// let settlement = settle(total, &paid, true).unwrap();
/// assert_eq!(settlement.shortfall.cents(), 10_000);
///
/// // Without one it is an underpayment
/// assert!(settle(total, &paid, false).is_err());
/// ```
pub fn settle(total: Money, amounts: &[Money], has_customer: bool) -> CoreResult<Settlement> {
    if !total.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "total_amount".to_string(),
        }
        .into());
    }
    validate_amount("total_amount", total)?;

    for (index, amount) in amounts.iter().enumerate() {
        let field = format!("payments[{}].amount", index);
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive { field }.into());
        }
        validate_amount(&field, *amount)?;
    }

    if !has_customer && amounts.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        }
        .into());
    }

    let paid = Money::checked_sum(amounts).ok_or_else(|| amount_out_of_range("payments"))?;
    let diff = paid - total;

    if !has_customer && diff < -MONEY_EPSILON {
        return Err(CoreError::Underpayment { total, paid });
    }

    if diff > MONEY_EPSILON && exceeds_overpayment_cap(total, paid) {
        return Err(CoreError::ExcessiveOverpayment {
            total,
            paid,
            max_percent: MAX_OVERPAYMENT_BPS / 100,
        });
    }

    let shortfall = if has_customer && paid < total {
        total - paid
    } else {
        Money::zero()
    };

    let overpaid = if diff.is_positive() { diff } else { Money::zero() };

    Ok(Settlement {
        total,
        paid,
        shortfall,
        overpaid,
    })
}

/// `(paid - total) / total > MAX_OVERPAYMENT_BPS / 10_000`, in integers.
fn exceeds_overpayment_cap(total: Money, paid: Money) -> bool {
    let over = (paid - total).cents() as i128;
    over * 10_000 > total.cents() as i128 * MAX_OVERPAYMENT_BPS as i128
}

/// Total for a simple sale: the caller's hint when given and non-zero,
/// otherwise quantity × selling price.
pub fn resolve_sale_total(
    hint: Option<Money>,
    quantity: i64,
    selling_price: Money,
) -> CoreResult<Money> {
    match hint {
        Some(total) if !total.is_zero() => Ok(total),
        _ => selling_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| amount_out_of_range("total_amount").into()),
    }
}

/// Every accepted sale satisfies `total ≈ quantity × unit_price` (±0.01).
pub fn check_line_total(total: Money, quantity: i64, unit_price: Money) -> CoreResult<()> {
    let expected = unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| amount_out_of_range("total_amount"))?;
    if total.approx_eq(expected) {
        Ok(())
    } else {
        Err(CoreError::TotalMismatch { total, expected })
    }
}

/// Picks the sale's primary payment method.
///
/// ## Resolution Order
/// 1. The first tender line's method
/// 2. An active method whose name contains "credit"
/// 3. The first active method
/// 4. `NoPaymentMethodAvailable`
pub fn resolve_primary_method(
    first_line: Option<&TenderLine>,
    active_methods: &[PaymentMethod],
) -> CoreResult<String> {
    if let Some(line) = first_line {
        return Ok(line.payment_method_id.clone());
    }

    let active = || active_methods.iter().filter(|m| m.is_active);

    active()
        .find(|m| m.name.to_lowercase().contains("credit"))
        .or_else(|| active().next())
        .map(|m| m.id.clone())
        .ok_or(CoreError::NoPaymentMethodAvailable)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(values: &[i64]) -> Vec<Money> {
        values.iter().map(|c| Money::from_cents(*c)).collect()
    }

    fn method(id: &str, name: &str, active: bool) -> PaymentMethod {
        PaymentMethod {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            is_active: active,
        }
    }

    #[test]
    fn test_exact_payment_without_customer() {
        let s = settle(Money::from_cents(100_000), &cents(&[60_000, 40_000]), false).unwrap();
        assert_eq!(s.paid.cents(), 100_000);
        assert!(!s.creates_debt());
        assert!(s.overpaid.is_zero());
    }

    #[test]
    fn test_one_cent_short_is_tolerated() {
        let s = settle(Money::from_cents(100_000), &cents(&[99_999]), false).unwrap();
        assert!(s.shortfall.is_zero());
    }

    #[test]
    fn test_underpayment_without_customer() {
        let err = settle(Money::from_cents(100_000), &cents(&[60_000, 30_000]), false).unwrap_err();
        assert!(matches!(err, CoreError::Underpayment { .. }));
    }

    #[test]
    fn test_payments_required_without_customer() {
        let err = settle(Money::from_cents(100_000), &[], false).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn test_customer_shortfall_becomes_debt() {
        let s = settle(Money::from_cents(100_000), &cents(&[60_000, 30_000]), true).unwrap();
        assert!(s.creates_debt());
        assert_eq!(s.shortfall.cents(), 10_000);
        assert_eq!((s.paid + s.shortfall).cents(), 100_000);
    }

    #[test]
    fn test_customer_with_no_payments_owes_everything() {
        let s = settle(Money::from_cents(50_000), &[], true).unwrap();
        assert_eq!(s.shortfall.cents(), 50_000);
    }

    #[test]
    fn test_overpayment_cap_boundary() {
        // exactly 20% over is allowed
        assert!(settle(Money::from_cents(100_000), &cents(&[120_000]), false).is_ok());

        // one cent more is not
        let err = settle(Money::from_cents(100_000), &cents(&[120_001]), false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ExcessiveOverpayment { max_percent: 20, .. }
        ));
    }

    #[test]
    fn test_overpayment_cap_applies_with_customer() {
        let err = settle(Money::from_cents(10_000), &cents(&[15_000]), true).unwrap_err();
        assert!(matches!(err, CoreError::ExcessiveOverpayment { .. }));
    }

    #[test]
    fn test_overpaid_reports_change() {
        let s = settle(Money::from_cents(10_000), &cents(&[11_000]), false).unwrap();
        assert_eq!(s.overpaid.cents(), 1_000);
    }

    #[test]
    fn test_non_positive_lines_rejected() {
        let err = settle(Money::from_cents(10_000), &cents(&[10_000, 0]), false).unwrap_err();
        match err {
            CoreError::Validation(ValidationError::MustBePositive { field }) => {
                assert_eq!(field, "payments[1].amount")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_sale_total() {
        let price = Money::from_cents(10_000);
        assert_eq!(resolve_sale_total(None, 3, price).unwrap().cents(), 30_000);
        assert_eq!(
            resolve_sale_total(Some(Money::zero()), 3, price).unwrap().cents(),
            30_000
        );
        assert_eq!(
            resolve_sale_total(Some(Money::from_cents(29_000)), 3, price)
                .unwrap()
                .cents(),
            29_000
        );
    }

    #[test]
    fn test_huge_payments_rejected_without_overflow() {
        let max = Money::from_cents(i64::MAX);
        let err = settle(Money::from_cents(10_000), &[max, max], false).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let err = settle(max, &cents(&[10_000]), true).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn test_huge_unit_price_rejected_without_overflow() {
        let unit = Money::from_cents(i64::MAX / 2);
        let err = check_line_total(Money::from_cents(30_000), 3, unit).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        assert!(resolve_sale_total(None, 3, unit).is_err());
    }

    #[test]
    fn test_line_total_tolerance() {
        let unit = Money::from_cents(10_000);
        assert!(check_line_total(Money::from_cents(30_000), 3, unit).is_ok());
        assert!(check_line_total(Money::from_cents(30_001), 3, unit).is_ok());
        assert!(matches!(
            check_line_total(Money::from_cents(29_000), 3, unit),
            Err(CoreError::TotalMismatch { .. })
        ));
    }

    #[test]
    fn test_primary_method_resolution() {
        let methods = vec![
            method("cash", "Cash", true),
            method("old-credit", "Store Credit", false),
            method("credit", "Credit", true),
        ];

        let line = TenderLine {
            payment_method_id: "mpesa".to_string(),
            amount: Money::from_cents(100),
            reference_number: None,
        };
        assert_eq!(resolve_primary_method(Some(&line), &methods).unwrap(), "mpesa");
        assert_eq!(resolve_primary_method(None, &methods).unwrap(), "credit");

        let no_credit = vec![method("cash", "Cash", true)];
        assert_eq!(resolve_primary_method(None, &no_credit).unwrap(), "cash");

        assert!(matches!(
            resolve_primary_method(None, &[method("x", "Credit", false)]),
            Err(CoreError::NoPaymentMethodAvailable)
        ));
    }
}
