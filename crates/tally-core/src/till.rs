//! # Till Lifecycle
//!
//! The single global cash till as a tagged state machine.
//!
//! ## States and Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Till Shift Lifecycle                              │
//! │                                                                         │
//! │   (no shift) ──open──► Open ──close──► Closed ──reconcile──► Reconciled │
//! │                         │                 │                             │
//! │                         │ reconcile       │ close                       │
//! │                         ▼                 ▼                             │
//! │                     NotClosed         NoOpenTill                        │
//! │                                                                         │
//! │   Next open must flip the shift type of the last Closed/Reconciled      │
//! │   shift: day → night → day → ...                                        │
//! │                                                                         │
//! │   If that last shift is still Closed (not reconciled), the cashier      │
//! │   must declare the cash physically handed over (opening balance).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::actor::Actor;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Maximum time a shift may stay open before it can no longer be closed normally.
pub const MAX_SHIFT_HOURS: i64 = 24;

// =============================================================================
// Shift Type
// =============================================================================

/// Day or night shift. Consecutive shifts must alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    Day,
    Night,
}

impl ShiftType {
    /// The type the next shift must have.
    pub const fn opposite(self) -> ShiftType {
        match self {
            ShiftType::Day => ShiftType::Night,
            ShiftType::Night => ShiftType::Day,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ShiftType::Day),
            "night" => Ok(ShiftType::Night),
            _ => Err(ValidationError::NotAllowed {
                field: "shift_type".to_string(),
                allowed: vec!["day".to_string(), "night".to_string()],
            }),
        }
    }
}

// =============================================================================
// Till Status
// =============================================================================

/// Where a till shift is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TillStatus {
    Open,
    Closed,
    Reconciled,
}

/// Events that move a shift forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TillTransition {
    Close,
    Reconcile,
}

impl TillStatus {
    /// Applies `event` to the current status.
    ///
    /// ```rust
    /// use tally_core::till::{TillStatus, TillTransition};
    ///
    /// let closed = TillStatus::Open.transition(TillTransition::Close).unwrap();
    /// assert_eq!(closed, TillStatus::Closed);
    /// assert!(TillStatus::Open.transition(TillTransition::Reconcile).is_err());
    /// ```
    pub fn transition(self, event: TillTransition) -> CoreResult<TillStatus> {
        match (self, event) {
            (TillStatus::Open, TillTransition::Close) => Ok(TillStatus::Closed),
            (TillStatus::Closed, TillTransition::Reconcile) => Ok(TillStatus::Reconciled),
            (TillStatus::Open, TillTransition::Reconcile) => Err(CoreError::NotClosed),
            (TillStatus::Reconciled, TillTransition::Reconcile) => {
                Err(CoreError::AlreadyReconciled)
            }
            (TillStatus::Closed | TillStatus::Reconciled, TillTransition::Close) => {
                Err(CoreError::NoOpenTill)
            }
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TillStatus::Open => "open",
            TillStatus::Closed => "closed",
            TillStatus::Reconciled => "reconciled",
        }
    }
}

impl fmt::Display for TillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TillStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TillStatus::Open),
            "closed" => Ok(TillStatus::Closed),
            "reconciled" => Ok(TillStatus::Reconciled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    "open".to_string(),
                    "closed".to_string(),
                    "reconciled".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Till Shift
// =============================================================================

/// One cashier session on the till.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TillShift {
    pub id: String,
    pub shift_type: ShiftType,
    pub status: TillStatus,
    pub opening_cash_float_cents: i64,
    /// Cash handed over from an unreconciled previous shift.
    pub opening_balance_cents: Option<i64>,
    #[ts(as = "String")]
    pub opening_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closing_time: Option<DateTime<Utc>>,
    pub closing_cash_float_cents: Option<i64>,
    pub opened_by_id: String,
    pub opened_by_name: String,
    pub closed_by_id: Option<String>,
    pub notes: Option<String>,
}

impl TillShift {
    pub fn opening_cash_float(&self) -> Money {
        Money::from_cents(self.opening_cash_float_cents)
    }

    pub fn closing_cash_float(&self) -> Money {
        Money::from_cents(self.closing_cash_float_cents.unwrap_or(0))
    }

    /// End of the sales window: closing time, or `now` while still open.
    pub fn window_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.closing_time.unwrap_or(now)
    }

    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.opened_by_id == actor.user_id
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Validates an open request against the most recent closed/reconciled shift.
///
/// ## Rules
/// 1. Opening float must not be negative
/// 2. `requested` must be the opposite of the previous shift's type
/// 3. Previous shift still `closed` → `opening_balance` required and positive
///
/// "No shift currently open" is enforced by storage, not here.
pub fn check_open_request(
    previous: Option<&TillShift>,
    requested: ShiftType,
    opening_float: Money,
    opening_balance: Option<Money>,
) -> CoreResult<()> {
    if opening_float.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "opening_cash_float".to_string(),
        }
        .into());
    }

    let Some(previous) = previous else {
        return Ok(());
    };

    let expected = previous.shift_type.opposite();
    if requested != expected {
        return Err(CoreError::ShiftTypeMismatch {
            previous: previous.shift_type,
            expected,
            requested,
        });
    }

    if previous.status != TillStatus::Reconciled {
        match opening_balance {
            Some(balance) if balance.is_positive() => {}
            _ => return Err(CoreError::OpeningBalanceRequired),
        }
    }

    Ok(())
}

/// Validates a close request for `shift` made by `actor` at `closing_time`.
pub fn check_close_request(
    shift: &TillShift,
    actor: &Actor,
    closing_float: Money,
    closing_time: DateTime<Utc>,
) -> CoreResult<()> {
    shift.status.transition(TillTransition::Close)?;
    actor.ensure_can_transact()?;

    if !shift.is_owned_by(actor) && !actor.is_superuser {
        return Err(CoreError::forbidden(
            "only the cashier who opened the till or an administrator can close it",
        ));
    }

    if closing_float.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "closing_cash_float".to_string(),
        }
        .into());
    }

    let elapsed = closing_time - shift.opening_time;
    if elapsed > Duration::hours(MAX_SHIFT_HOURS) {
        return Err(CoreError::ShiftTooLong {
            hours: elapsed.num_hours(),
            max_hours: MAX_SHIFT_HOURS,
        });
    }

    Ok(())
}

/// Owner, administrator or auditor may read a shift's figures.
pub fn check_can_view(shift: &TillShift, actor: &Actor) -> CoreResult<()> {
    if shift.is_owned_by(actor) || actor.can_view_all() {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "only the cashier who opened this shift or an administrator can view it",
        ))
    }
}

/// Owner or administrator may reconcile; auditors only read.
pub fn check_can_reconcile(shift: &TillShift, actor: &Actor) -> CoreResult<()> {
    if shift.is_owned_by(actor) || actor.is_superuser {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "only the cashier who opened this shift can reconcile it",
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(shift_type: ShiftType, status: TillStatus) -> TillShift {
        let opened = Utc::now() - Duration::hours(8);
        TillShift {
            id: "shift-1".to_string(),
            shift_type,
            status,
            opening_cash_float_cents: 500_000,
            opening_balance_cents: None,
            opening_time: opened,
            closing_time: None,
            closing_cash_float_cents: None,
            opened_by_id: "cashier-1".to_string(),
            opened_by_name: "Ann".to_string(),
            closed_by_id: None,
            notes: None,
        }
    }

    fn cashier(id: &str) -> Actor {
        Actor::cashier(id, "Cashier")
    }

    #[test]
    fn test_transitions() {
        use TillStatus::*;
        use TillTransition::*;

        assert_eq!(Open.transition(Close).unwrap(), Closed);
        assert_eq!(Closed.transition(Reconcile).unwrap(), Reconciled);
        assert!(matches!(Open.transition(Reconcile), Err(CoreError::NotClosed)));
        assert!(matches!(
            Reconciled.transition(Reconcile),
            Err(CoreError::AlreadyReconciled)
        ));
        assert!(matches!(Closed.transition(Close), Err(CoreError::NoOpenTill)));
    }

    #[test]
    fn test_shift_type_alternates() {
        assert_eq!(ShiftType::Day.opposite(), ShiftType::Night);
        assert_eq!(ShiftType::Night.opposite(), ShiftType::Day);
        assert_eq!("NIGHT".parse::<ShiftType>().unwrap(), ShiftType::Night);
        assert!("evening".parse::<ShiftType>().is_err());
    }

    #[test]
    fn test_first_shift_can_be_either_type() {
        let float = Money::from_cents(500_000);
        assert!(check_open_request(None, ShiftType::Day, float, None).is_ok());
        assert!(check_open_request(None, ShiftType::Night, float, None).is_ok());
    }

    #[test]
    fn test_open_requires_alternation() {
        let previous = shift(ShiftType::Day, TillStatus::Reconciled);
        let err = check_open_request(
            Some(&previous),
            ShiftType::Day,
            Money::from_cents(500_000),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ShiftTypeMismatch {
                expected: ShiftType::Night,
                ..
            }
        ));

        assert!(check_open_request(
            Some(&previous),
            ShiftType::Night,
            Money::from_cents(500_000),
            None
        )
        .is_ok());
    }

    #[test]
    fn test_unreconciled_previous_requires_opening_balance() {
        let previous = shift(ShiftType::Night, TillStatus::Closed);
        let float = Money::from_cents(500_000);

        assert!(matches!(
            check_open_request(Some(&previous), ShiftType::Day, float, None),
            Err(CoreError::OpeningBalanceRequired)
        ));
        assert!(matches!(
            check_open_request(Some(&previous), ShiftType::Day, float, Some(Money::zero())),
            Err(CoreError::OpeningBalanceRequired)
        ));
        assert!(check_open_request(
            Some(&previous),
            ShiftType::Day,
            float,
            Some(Money::from_cents(530_000))
        )
        .is_ok());
    }

    #[test]
    fn test_negative_opening_float_rejected() {
        let err = check_open_request(None, ShiftType::Day, Money::from_cents(-1), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_close_by_opener() {
        let open = shift(ShiftType::Day, TillStatus::Open);
        assert!(check_close_request(
            &open,
            &cashier("cashier-1"),
            Money::from_cents(530_000),
            Utc::now()
        )
        .is_ok());
    }

    #[test]
    fn test_close_by_other_cashier_forbidden() {
        let open = shift(ShiftType::Day, TillStatus::Open);
        let err = check_close_request(
            &open,
            &cashier("cashier-2"),
            Money::from_cents(530_000),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));

        let admin = Actor::administrator("admin-1", "Boss");
        assert!(check_close_request(&open, &admin, Money::zero(), Utc::now()).is_ok());
    }

    #[test]
    fn test_inactive_admin_cannot_close() {
        let open = shift(ShiftType::Day, TillStatus::Open);
        let admin = Actor {
            is_active: false,
            ..Actor::administrator("admin-1", "Boss")
        };

        let err = check_close_request(&open, &admin, Money::zero(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));
    }

    #[test]
    fn test_close_after_24_hours_rejected() {
        let mut open = shift(ShiftType::Day, TillStatus::Open);
        open.opening_time = Utc::now() - Duration::hours(25);
        let err = check_close_request(&open, &cashier("cashier-1"), Money::zero(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::ShiftTooLong { hours: 25, .. }));
    }

    #[test]
    fn test_close_requires_open_status() {
        let closed = shift(ShiftType::Day, TillStatus::Closed);
        let err = check_close_request(&closed, &cashier("cashier-1"), Money::zero(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::NoOpenTill));
    }

    #[test]
    fn test_view_and_reconcile_permissions() {
        let closed = shift(ShiftType::Day, TillStatus::Closed);
        let auditor = Actor {
            is_auditor: true,
            ..cashier("auditor-1")
        };

        assert!(check_can_view(&closed, &auditor).is_ok());
        assert!(check_can_reconcile(&closed, &auditor).is_err());
        assert!(check_can_view(&closed, &cashier("cashier-2")).is_err());
        assert!(check_can_reconcile(&closed, &cashier("cashier-1")).is_ok());
    }
}
