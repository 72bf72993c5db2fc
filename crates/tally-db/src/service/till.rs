//! # Till Shift Manager
//!
//! Opens and closes till shifts and reports on them.
//!
//! ## Shift Lifecycle
//! ```text
//!                open_till                close_till              reconcile
//!   (no shift) ───────────►  open  ─────────────────►  closed  ─────────────►  reconciled
//!                  │                                      │
//!                  │  next shift must alternate day/night │
//!                  │  and carry an opening balance while  │
//!                  └──── the previous one is unreconciled ┘
//! ```
//!
//! At most one shift is open. The partial unique index
//! `idx_till_shifts_one_open` decides races between two openers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::till;
use crate::service::reconciliation::SystemCountCalculator;
use crate::Database;
use tally_core::money::Money;
use tally_core::till::{check_can_view, check_close_request, check_open_request};
use tally_core::validation::{normalize_text, validate_amount, validate_id, validate_page};
use tally_core::{
    new_id, Actor, CashierVariance, CoreError, ShiftType, SystemCount, TillShift, TillStatus,
};

#[derive(Debug, Clone)]
pub struct OpenTillRequest {
    pub shift_type: ShiftType,
    pub opening_cash_float: Money,
    /// Required while the previous shift is still unreconciled.
    pub opening_balance: Option<Money>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CloseTillRequest {
    pub closing_cash_float: Money,
    pub notes: Option<String>,
}

/// Whether the POS is unlocked, and by whom.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TillStatusView {
    pub is_open: bool,
    pub till_id: Option<String>,
    pub opened_by: Option<String>,
    pub opened_by_name: Option<String>,
    pub opening_time: Option<DateTime<Utc>>,
    pub shift_type: Option<ShiftType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShiftPage {
    pub data: Vec<TillShift>,
    pub count: i64,
}

/// Figures for one shift.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftSummary {
    pub shift: TillShift,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub items_sold: i64,
    pub duration_minutes: i64,
    pub payment_methods: Vec<SystemCount>,
    /// Present once the shift is reconciled.
    pub variance: Option<CashierVariance>,
}

/// Till shift state machine.
#[derive(Debug, Clone)]
pub struct TillShiftManager {
    db: Database,
}

impl TillShiftManager {
    pub fn new(db: Database) -> Self {
        TillShiftManager { db }
    }

    /// Opens a new shift.
    pub async fn open_till(&self, actor: &Actor, request: OpenTillRequest) -> DbResult<TillShift> {
        actor.ensure_can_transact()?;
        let notes = normalize_text("notes", request.notes.as_deref())?;
        validate_amount("opening_cash_float", request.opening_cash_float)?;
        if let Some(balance) = request.opening_balance {
            validate_amount("opening_balance", balance)?;
        }

        let repo = self.db.till_shifts();
        if repo.current_open().await?.is_some() {
            return Err(CoreError::AlreadyOpen.into());
        }

        let previous = repo.last_terminal().await?;
        check_open_request(
            previous.as_ref(),
            request.shift_type,
            request.opening_cash_float,
            request.opening_balance,
        )?;

        let shift = TillShift {
            id: new_id(),
            shift_type: request.shift_type,
            status: TillStatus::Open,
            opening_cash_float_cents: request.opening_cash_float.cents(),
            opening_balance_cents: request.opening_balance.map(|b| b.cents()),
            opening_time: Utc::now(),
            closing_time: None,
            closing_cash_float_cents: None,
            opened_by_id: actor.user_id.clone(),
            opened_by_name: actor.name.clone(),
            closed_by_id: None,
            notes,
        };

        match repo.insert(&shift).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("till_shifts.status") => {
                return Err(CoreError::AlreadyOpen.into());
            }
            Err(err) => return Err(err),
        }

        info!(
            till_id = %shift.id,
            shift_type = %shift.shift_type,
            opened_by = %shift.opened_by_id,
            opening_float = %request.opening_cash_float,
            "Till opened"
        );

        Ok(shift)
    }

    /// Closes the open shift.
    ///
    /// The write lock is taken before the clock is read, so every sale that
    /// saw the till open is stamped no later than `closing_time`.
    pub async fn close_till(&self, actor: &Actor, request: CloseTillRequest) -> DbResult<TillShift> {
        actor.ensure_can_transact()?;
        let notes = normalize_text("notes", request.notes.as_deref())?;
        validate_amount("closing_cash_float", request.closing_cash_float)?;

        let mut tx = self.db.pool().begin().await?;

        let shift = till::lock_open(&mut *tx).await?.ok_or(CoreError::NoOpenTill)?;

        let now = Utc::now();
        check_close_request(&shift, actor, request.closing_cash_float, now)?;

        let closed = till::close(
            &mut *tx,
            &shift.id,
            now,
            request.closing_cash_float.cents(),
            &actor.user_id,
            notes.as_deref(),
        )
        .await?;
        if !closed {
            return Err(CoreError::NoOpenTill.into());
        }

        let shift = till::get_in(&mut *tx, &shift.id)
            .await?
            .ok_or_else(|| DbError::not_found("TillShift", &shift.id))?;

        tx.commit().await?;

        info!(
            till_id = %shift.id,
            closed_by = %actor.user_id,
            closing_float = %request.closing_cash_float,
            "Till closed"
        );

        Ok(shift)
    }

    pub async fn till_status(&self) -> DbResult<TillStatusView> {
        let view = match self.db.till_shifts().current_open().await? {
            Some(shift) => TillStatusView {
                is_open: true,
                till_id: Some(shift.id),
                opened_by: Some(shift.opened_by_id),
                opened_by_name: Some(shift.opened_by_name),
                opening_time: Some(shift.opening_time),
                shift_type: Some(shift.shift_type),
            },
            None => TillStatusView::default(),
        };

        Ok(view)
    }

    pub async fn current_shift(&self) -> DbResult<TillShift> {
        self.db
            .till_shifts()
            .current_open()
            .await?
            .ok_or_else(|| CoreError::NoOpenTill.into())
    }

    /// Shifts newest first. Cashiers only see the shifts they opened.
    pub async fn list_shifts(
        &self,
        actor: &Actor,
        status: Option<TillStatus>,
        skip: i64,
        limit: i64,
    ) -> DbResult<ShiftPage> {
        validate_page(skip, limit)?;

        let opened_by = if actor.can_view_all() {
            None
        } else {
            Some(actor.user_id.as_str())
        };

        let (data, count) = self
            .db
            .till_shifts()
            .list(opened_by, status, skip, limit)
            .await?;

        Ok(ShiftPage { data, count })
    }

    pub async fn shift_summary(&self, actor: &Actor, shift_id: &str) -> DbResult<ShiftSummary> {
        validate_id("shift_id", shift_id)?;

        let shift = self
            .db
            .till_shifts()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("TillShift", shift_id))?;
        check_can_view(&shift, actor)?;

        debug!(till_id = %shift.id, "Building shift summary");

        let now = Utc::now();
        let mut conn = self.db.pool().acquire().await?;
        let counts = SystemCountCalculator::compute(&mut conn, &shift, now).await?;
        drop(conn);

        let variance = if shift.status == TillStatus::Reconciled {
            self.db.reconciliations().variance_for_shift(&shift.id).await?
        } else {
            None
        };

        let duration_minutes = (shift.window_end(now) - shift.opening_time).num_minutes();

        Ok(ShiftSummary {
            total_sales_cents: counts.window.total_sales.cents(),
            total_transactions: counts.window.transactions(),
            items_sold: counts.window.items_sold,
            duration_minutes,
            payment_methods: counts.system_counts,
            variance,
            shift,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
