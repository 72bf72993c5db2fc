//! # Reconciliation Math
//!
//! System counts and variance classification for a closed shift.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Shift Reconciliation                                │
//! │                                                                         │
//! │  Sales in [opening_time, closing_time] by the shift's cashier          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  aggregate_system_counts()  ← one source of truth per sale:            │
//! │       │                       splits if any, else primary method       │
//! │       ▼                                                                 │
//! │  SystemCount per active payment method                                  │
//! │       │                                                                 │
//! │       │◄──── physical counts typed in by the cashier                   │
//! │       ▼                                                                 │
//! │  compute_variance()  → lines, signed total, none/shortage/overage      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  |total| ≥ threshold?  → alert note + notification                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::{amount_out_of_range, validate_amount};

/// Default alert threshold: 100.00.
pub const DEFAULT_VARIANCE_THRESHOLD: Money = Money::from_cents(10_000);

// =============================================================================
// Variance Type
// =============================================================================

/// Direction of a shift's total variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum VarianceType {
    None,
    Shortage,
    Overage,
}

impl VarianceType {
    /// Classifies a signed total (physical - system).
    pub fn classify(total: Money) -> VarianceType {
        if total.is_negative() {
            VarianceType::Shortage
        } else if total.is_positive() {
            VarianceType::Overage
        } else {
            VarianceType::None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            VarianceType::None => "none",
            VarianceType::Shortage => "shortage",
            VarianceType::Overage => "overage",
        }
    }
}

impl fmt::Display for VarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// System Counts
// =============================================================================

/// One split of a split-payment sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitAmount {
    pub payment_method_id: String,
    pub amount: Money,
}

/// What a sale contributes to the system counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleTender {
    pub sale_id: String,
    pub primary_method_id: String,
    pub total_amount: Money,
    pub splits: Vec<SplitAmount>,
}

/// Expected total for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SystemCount {
    pub payment_method_id: String,
    pub payment_method_name: String,
    pub system_count_cents: i64,
}

impl SystemCount {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.system_count_cents)
    }
}

/// Sums sale tenders per payment method.
///
/// A sale with split rows contributes only its splits; a sale without them
/// contributes its total to the primary method. No sale is counted twice.
/// Every method in `methods` appears in the output, in order, even at zero.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::reconciliation::{aggregate_system_counts, SaleTender, SplitAmount};
/// use tally_core::types::PaymentMethod;
///
/// let cash = PaymentMethod { id: "cash".into(), name: "Cash".into(), description: None, is_active: true };
/// let sales = vec![
///     SaleTender { sale_id: "s1".into(), primary_method_id: "cash".into(),
///                  total_amount: Money::from_cents(30_000), splits: vec![] },
///     SaleTender { sale_id: "s2".into(), primary_method_id: "cash".into(),
///                  total_amount: Money::from_cents(10_000),
///                  splits: vec![SplitAmount { payment_method_id: "cash".into(),
///                                             amount: Money::from_cents(6_000) }] },
/// ];
///
/// let counts = aggregate_system_counts(&[cash], &sales);
/// assert_eq!(counts[0].system_count_cents, 36_000);
/// ```
pub fn aggregate_system_counts(methods: &[PaymentMethod], sales: &[SaleTender]) -> Vec<SystemCount> {
    let mut totals: HashMap<&str, Money> = HashMap::new();

    for sale in sales {
        if sale.splits.is_empty() {
            *totals.entry(sale.primary_method_id.as_str()).or_default() += sale.total_amount;
        } else {
            for split in &sale.splits {
                *totals.entry(split.payment_method_id.as_str()).or_default() += split.amount;
            }
        }
    }

    methods
        .iter()
        .map(|method| SystemCount {
            payment_method_id: method.id.clone(),
            payment_method_name: method.name.clone(),
            system_count_cents: totals
                .get(method.id.as_str())
                .copied()
                .unwrap_or_default()
                .cents(),
        })
        .collect()
}

// =============================================================================
// Variance
// =============================================================================

/// Physical vs system for one counted payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VarianceLine {
    pub payment_method_id: String,
    pub system_count_cents: i64,
    pub physical_count_cents: i64,
    pub variance_cents: i64,
}

/// Result of comparing physical counts against system counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarianceSummary {
    pub lines: Vec<VarianceLine>,
    /// Signed: negative is a shortage.
    pub total_variance: Money,
    pub variance_type: VarianceType,
    pub exceeds_threshold: bool,
}

impl VarianceSummary {
    /// Magnitude stored on the cashier variance record.
    pub fn magnitude(&self) -> Money {
        self.total_variance.abs()
    }
}

/// Compares each counted method with its system count.
///
/// Methods missing from `system` count as zero expected. Physical amounts
/// must not be negative.
pub fn compute_variance(
    system: &[SystemCount],
    physical: &BTreeMap<String, Money>,
    threshold: Money,
) -> CoreResult<VarianceSummary> {
    let expected: HashMap<&str, Money> = system
        .iter()
        .map(|c| (c.payment_method_id.as_str(), c.amount()))
        .collect();

    let mut lines = Vec::with_capacity(physical.len());
    let mut total_variance = Money::zero();

    for (method_id, counted) in physical {
        let field = format!("physical_counts.{}", method_id);
        validate_amount(&field, *counted)?;

        let system_amount = expected.get(method_id.as_str()).copied().unwrap_or_default();
        let variance = counted
            .checked_sub(system_amount)
            .ok_or_else(|| amount_out_of_range(&field))?;
        total_variance = total_variance
            .checked_add(variance)
            .ok_or_else(|| amount_out_of_range("physical_counts"))?;

        lines.push(VarianceLine {
            payment_method_id: method_id.clone(),
            system_count_cents: system_amount.cents(),
            physical_count_cents: counted.cents(),
            variance_cents: variance.cents(),
        });
    }

    Ok(VarianceSummary {
        lines,
        total_variance,
        variance_type: VarianceType::classify(total_variance),
        exceeds_threshold: total_variance.abs() >= threshold,
    })
}

/// Appends the threshold alert to the cashier's notes when it applies.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::reconciliation::alert_notes;
///
/// let notes = alert_notes(Some("Drawer jammed"), true, Money::from_cents(10_000));
/// assert_eq!(
///     notes.as_deref(),
///     Some("Drawer jammed\n[ALERT: Variance exceeds threshold of 100.00]")
/// );
/// ```
pub fn alert_notes(notes: Option<&str>, exceeds_threshold: bool, threshold: Money) -> Option<String> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    if !exceeds_threshold {
        return notes.map(str::to_string);
    }

    let alert = format!(
        "[ALERT: Variance exceeds threshold of {}]",
        threshold.to_decimal_string()
    );
    Some(match notes {
        Some(existing) => format!("{}\n{}", existing, alert),
        None => alert,
    })
}

/// Payload handed to the notification hook when a variance crosses the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarianceAlert {
    pub till_shift_id: String,
    pub reconciliation_id: String,
    pub cashier_id: String,
    pub cashier_name: String,
    pub total_variance: Money,
    pub variance_type: VarianceType,
    pub threshold: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use crate::MAX_AMOUNT_CENTS;

    fn method(id: &str, name: &str) -> PaymentMethod {
        PaymentMethod {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            is_active: true,
        }
    }

    fn simple(id: &str, method: &str, cents: i64) -> SaleTender {
        SaleTender {
            sale_id: id.to_string(),
            primary_method_id: method.to_string(),
            total_amount: Money::from_cents(cents),
            splits: Vec::new(),
        }
    }

    fn split(method: &str, cents: i64) -> SplitAmount {
        SplitAmount {
            payment_method_id: method.to_string(),
            amount: Money::from_cents(cents),
        }
    }

    fn counts(pairs: &[(&str, i64)]) -> BTreeMap<String, Money> {
        pairs
            .iter()
            .map(|(id, c)| (id.to_string(), Money::from_cents(*c)))
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(VarianceType::classify(Money::zero()), VarianceType::None);
        assert_eq!(VarianceType::classify(Money::from_cents(-1)), VarianceType::Shortage);
        assert_eq!(VarianceType::classify(Money::from_cents(1)), VarianceType::Overage);
    }

    #[test]
    fn test_split_sale_is_not_double_counted() {
        let methods = vec![method("cash", "Cash"), method("mpesa", "M-Pesa")];
        let sales = vec![SaleTender {
            sale_id: "s1".to_string(),
            primary_method_id: "cash".to_string(),
            total_amount: Money::from_cents(100_000),
            splits: vec![split("cash", 60_000), split("mpesa", 40_000)],
        }];

        let result = aggregate_system_counts(&methods, &sales);
        assert_eq!(result[0].system_count_cents, 60_000);
        assert_eq!(result[1].system_count_cents, 40_000);
    }

    #[test]
    fn test_every_method_listed_even_at_zero() {
        let methods = vec![method("cash", "Cash"), method("mpesa", "M-Pesa")];
        let result = aggregate_system_counts(&methods, &[simple("s1", "cash", 500)]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].payment_method_name, "M-Pesa");
        assert_eq!(result[1].system_count_cents, 0);
    }

    #[test]
    fn test_sales_on_unlisted_methods_are_ignored() {
        let methods = vec![method("cash", "Cash")];
        let result = aggregate_system_counts(&methods, &[simple("s1", "retired", 500)]);
        assert_eq!(result[0].system_count_cents, 0);
    }

    #[test]
    fn test_balanced_count_has_no_variance() {
        let system = aggregate_system_counts(
            &[method("cash", "Cash")],
            &[simple("s1", "cash", 300_000), simple("s2", "cash", 230_000)],
        );
        let summary = compute_variance(
            &system,
            &counts(&[("cash", 530_000)]),
            DEFAULT_VARIANCE_THRESHOLD,
        )
        .unwrap();

        assert!(summary.total_variance.is_zero());
        assert_eq!(summary.variance_type, VarianceType::None);
        assert!(!summary.exceeds_threshold);
    }

    #[test]
    fn test_shortage_at_threshold_raises_alert() {
        let system = aggregate_system_counts(&[method("cash", "Cash")], &[simple("s1", "cash", 510_000)]);
        let summary = compute_variance(
            &system,
            &counts(&[("cash", 490_000)]),
            DEFAULT_VARIANCE_THRESHOLD,
        )
        .unwrap();

        assert_eq!(summary.total_variance.cents(), -20_000);
        assert_eq!(summary.magnitude().cents(), 20_000);
        assert_eq!(summary.variance_type, VarianceType::Shortage);
        assert!(summary.exceeds_threshold);
        assert_eq!(summary.lines[0].variance_cents, -20_000);
    }

    #[test]
    fn test_line_variances_sum_to_total() {
        let system = aggregate_system_counts(
            &[method("cash", "Cash"), method("mpesa", "M-Pesa")],
            &[simple("s1", "cash", 10_000), simple("s2", "mpesa", 5_000)],
        );
        let summary = compute_variance(
            &system,
            &counts(&[("cash", 9_500), ("mpesa", 5_200)]),
            DEFAULT_VARIANCE_THRESHOLD,
        )
        .unwrap();

        let sum: i64 = summary.lines.iter().map(|l| l.variance_cents).sum();
        assert_eq!(sum, summary.total_variance.cents());
        assert_eq!(summary.total_variance.cents(), -300);
        assert!(!summary.exceeds_threshold);
    }

    #[test]
    fn test_uncounted_system_method_expected_zero() {
        let summary = compute_variance(&[], &counts(&[("cash", 1_000)]), DEFAULT_VARIANCE_THRESHOLD)
            .unwrap();
        assert_eq!(summary.variance_type, VarianceType::Overage);
        assert_eq!(summary.lines[0].system_count_cents, 0);
    }

    #[test]
    fn test_negative_physical_count_rejected() {
        assert!(compute_variance(&[], &counts(&[("cash", -1)]), DEFAULT_VARIANCE_THRESHOLD).is_err());
    }

    #[test]
    fn test_huge_physical_count_rejected_without_overflow() {
        let err = compute_variance(&[], &counts(&[("cash", i64::MAX)]), DEFAULT_VARIANCE_THRESHOLD)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. })
                if field == "physical_counts.cash"
        ));

        let summary = compute_variance(
            &[],
            &counts(&[("cash", MAX_AMOUNT_CENTS), ("mpesa", MAX_AMOUNT_CENTS)]),
            DEFAULT_VARIANCE_THRESHOLD,
        )
        .unwrap();
        assert_eq!(summary.total_variance.cents(), 2 * MAX_AMOUNT_CENTS);
    }

    #[test]
    fn test_alert_notes() {
        let threshold = Money::from_cents(10_000);
        assert_eq!(alert_notes(None, false, threshold), None);
        assert_eq!(alert_notes(Some("  "), false, threshold), None);
        assert_eq!(
            alert_notes(None, true, threshold).as_deref(),
            Some("[ALERT: Variance exceeds threshold of 100.00]")
        );
        assert_eq!(alert_notes(Some("ok"), false, threshold).as_deref(), Some("ok"));
    }
}
