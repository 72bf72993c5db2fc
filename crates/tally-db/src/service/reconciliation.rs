//! # Shift Reconciliation
//!
//! System counts for a shift, and the end-of-shift comparison against what
//! the cashier physically counted.
//!
//! ## Reconcile Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │  ├── UPDATE till_shifts SET status = 'reconciled'                      │
//! │  │        WHERE id = ? AND status = 'closed'   ← first statement       │
//! │  │        0 rows → AlreadyReconciled / NotClosed / NotFound            │
//! │  ├── SystemCountCalculator::compute             (same snapshot)        │
//! │  ├── compute_variance(system, physical, threshold)                     │
//! │  ├── INSERT shift_reconciliations                                      │
//! │  ├── INSERT payment_method_reconciliations × counted methods           │
//! │  ├── INSERT cashier_variances                                          │
//! │  COMMIT                                                                │
//! │  └── over threshold → NotificationSink::variance_alert                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::reconciliation::{self as records, VarianceFilter, VarianceReportRow};
use crate::repository::sale::{self, SaleWindow, ShiftWindow};
use crate::repository::{payment_method, till};
use crate::service::notify::{NotificationSink, TracingNotifier};
use crate::Database;
use tally_core::money::Money;
use tally_core::reconciliation::{
    aggregate_system_counts, alert_notes, compute_variance, VarianceAlert, VarianceLine,
    DEFAULT_VARIANCE_THRESHOLD,
};
use tally_core::till::{check_can_reconcile, check_can_view, TillTransition};
use tally_core::validation::{normalize_text, validate_date_range, validate_id, validate_page};
use tally_core::{
    new_id, Actor, CashierVariance, CoreError, PaymentMethodReconciliation, ReconciliationStatus,
    ShiftReconciliation, SystemCount, TillShift, TillStatus, VarianceType,
};

// =============================================================================
// System Counts
// =============================================================================

/// System counts plus the sales window they were computed from.
#[derive(Debug, Clone)]
pub struct ShiftCounts {
    pub system_counts: Vec<SystemCount>,
    pub window: SaleWindow,
}

/// Expected per-method totals for a shift.
#[derive(Debug, Clone, Copy)]
pub struct SystemCountCalculator;

impl SystemCountCalculator {
    /// Counts every active method over the shift's window on `conn`.
    ///
    /// The window is `[opening_time, closing_time]`, or up to `now` while the
    /// shift is open, restricted to sales the opener recorded.
    pub async fn compute(
        conn: &mut SqliteConnection,
        shift: &TillShift,
        now: DateTime<Utc>,
    ) -> DbResult<ShiftCounts> {
        let methods = payment_method::list_active(&mut *conn).await?;
        let window = sale::load_window(
            &mut *conn,
            &ShiftWindow {
                cashier_id: shift.opened_by_id.clone(),
                start: shift.opening_time,
                end: shift.window_end(now),
            },
        )
        .await?;

        let system_counts = aggregate_system_counts(&methods, &window.tenders);

        debug!(
            till_id = %shift.id,
            sales = window.transactions(),
            methods = system_counts.len(),
            "Computed system counts"
        );

        Ok(ShiftCounts {
            system_counts,
            window,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemCountsView {
    pub till_shift_id: String,
    pub opening_time: DateTime<Utc>,
    pub closing_time: Option<DateTime<Utc>>,
    pub payment_methods: Vec<SystemCount>,
}

// =============================================================================
// Requests and Results
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReconcileRequest {
    /// Counted amount per payment method id.
    pub physical_counts: BTreeMap<String, Money>,
    pub notes: Option<String>,
    /// Defaults to the most recently closed shift.
    pub shift_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub message: String,
    pub reconciliation_id: String,
    pub till_shift_id: String,
    /// Signed: negative is a shortage.
    pub total_variance_cents: i64,
    pub variance_type: VarianceType,
    pub alert_raised: bool,
    pub notes: Option<String>,
    pub lines: Vec<VarianceLine>,
}

#[derive(Debug, Clone, Default)]
pub struct VarianceQuery {
    pub cashier_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariancePage {
    pub data: Vec<VarianceReportRow>,
    pub count: i64,
    pub total_shortage_cents: i64,
    pub total_overage_cents: i64,
}

// =============================================================================
// Engine
// =============================================================================

/// Reconciles closed shifts and reports cashier variances.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    db: Database,
    threshold: Money,
    notifier: Arc<dyn NotificationSink>,
}

impl ReconciliationEngine {
    /// Engine with the default threshold (100.00) and a logging notifier.
    pub fn new(db: Database) -> Self {
        ReconciliationEngine {
            db,
            threshold: DEFAULT_VARIANCE_THRESHOLD,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_threshold(mut self, threshold: Money) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn threshold(&self) -> Money {
        self.threshold
    }

    /// Expected per-method totals for a shift.
    ///
    /// Without an id: the open shift, else the most recently closed one.
    /// An explicitly requested shift must already be closed.
    pub async fn get_system_counts(
        &self,
        actor: &Actor,
        shift_id: Option<&str>,
    ) -> DbResult<SystemCountsView> {
        let repo = self.db.till_shifts();

        let shift = match shift_id {
            Some(id) => {
                validate_id("shift_id", id)?;
                let shift = repo
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("TillShift", id))?;
                if shift.status == TillStatus::Open {
                    return Err(CoreError::NotClosed.into());
                }
                shift
            }
            None => match repo.current_open().await? {
                Some(open) => open,
                None => repo.last_terminal().await?.ok_or(CoreError::NoClosedShift)?,
            },
        };
        check_can_view(&shift, actor)?;

        let mut conn = self.db.pool().acquire().await?;
        let counts = SystemCountCalculator::compute(&mut conn, &shift, Utc::now()).await?;

        Ok(SystemCountsView {
            till_shift_id: shift.id,
            opening_time: shift.opening_time,
            closing_time: shift.closing_time,
            payment_methods: counts.system_counts,
        })
    }

    /// Compares physical counts with system counts and closes out the shift.
    pub async fn reconcile(&self, actor: &Actor, request: ReconcileRequest) -> DbResult<ReconcileOutcome> {
        actor.ensure_can_transact()?;
        let notes = normalize_text("notes", request.notes.as_deref())?;

        let repo = self.db.till_shifts();
        let shift = match request.shift_id.as_deref() {
            Some(id) => {
                validate_id("shift_id", id)?;
                repo.get_by_id(id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("TillShift", id))?
            }
            None => repo.last_terminal().await?.ok_or(CoreError::NoClosedShift)?,
        };

        shift.status.transition(TillTransition::Reconcile)?;
        check_can_reconcile(&shift, actor)?;

        let physical = self.known_methods_only(request.physical_counts).await?;

        let mut tx = self.db.pool().begin().await?;

        if !till::mark_reconciled(&mut *tx, &shift.id).await? {
            // Someone else moved the shift on since it was read.
            let current = till::get_in(&mut *tx, &shift.id)
                .await?
                .ok_or_else(|| CoreError::not_found("TillShift", &shift.id))?;
            current.status.transition(TillTransition::Reconcile)?;
            return Err(CoreError::AlreadyReconciled.into());
        }

        let now = Utc::now();
        let counts = SystemCountCalculator::compute(&mut *tx, &shift, now).await?;
        let summary = compute_variance(&counts.system_counts, &physical, self.threshold)?;
        let notes = alert_notes(notes.as_deref(), summary.exceeds_threshold, self.threshold);

        let header = ShiftReconciliation {
            id: new_id(),
            till_shift_id: shift.id.clone(),
            shift_date: shift.opening_time,
            opening_cash_float_cents: shift.opening_cash_float_cents,
            closing_cash_float_cents: shift.closing_cash_float().cents(),
            total_sales_cents: counts.window.total_sales.cents(),
            total_transactions: counts.window.transactions(),
            status: ReconciliationStatus::Completed,
            notes: notes.clone(),
            created_by_id: actor.user_id.clone(),
            created_at: now,
        };
        records::insert_header(&mut *tx, &header).await?;

        for line in &summary.lines {
            records::insert_line(
                &mut *tx,
                &PaymentMethodReconciliation {
                    id: new_id(),
                    shift_reconciliation_id: header.id.clone(),
                    payment_method_id: line.payment_method_id.clone(),
                    system_count_cents: line.system_count_cents,
                    physical_count_cents: line.physical_count_cents,
                    variance_cents: line.variance_cents,
                },
            )
            .await?;
        }

        records::insert_variance(
            &mut *tx,
            &CashierVariance {
                id: new_id(),
                till_shift_id: shift.id.clone(),
                cashier_id: shift.opened_by_id.clone(),
                total_variance_cents: summary.magnitude().cents(),
                variance_type: summary.variance_type,
                notes: notes.clone(),
                created_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            till_id = %shift.id,
            reconciliation_id = %header.id,
            total_variance = %summary.total_variance,
            variance_type = %summary.variance_type,
            "Shift reconciled"
        );

        if summary.exceeds_threshold {
            self.notifier.variance_alert(&VarianceAlert {
                till_shift_id: shift.id.clone(),
                reconciliation_id: header.id.clone(),
                cashier_id: shift.opened_by_id.clone(),
                cashier_name: shift.opened_by_name.clone(),
                total_variance: summary.total_variance,
                variance_type: summary.variance_type,
                threshold: self.threshold,
            });
        }

        Ok(ReconcileOutcome {
            message: "Shift reconciled successfully".to_string(),
            reconciliation_id: header.id,
            till_shift_id: shift.id,
            total_variance_cents: summary.total_variance.cents(),
            variance_type: summary.variance_type,
            alert_raised: summary.exceeds_threshold,
            notes,
            lines: summary.lines,
        })
    }

    /// Variance report. Cashiers only see their own records.
    pub async fn list_cashier_variances(
        &self,
        actor: &Actor,
        query: VarianceQuery,
    ) -> DbResult<VariancePage> {
        validate_page(query.skip, query.limit)?;
        validate_date_range(query.start_date, query.end_date)?;

        let cashier_id = if actor.can_view_all() {
            query.cashier_id
        } else {
            Some(actor.user_id.clone())
        };

        let (data, totals) = self
            .db
            .reconciliations()
            .list_variances(&VarianceFilter {
                cashier_id,
                start_date: query.start_date,
                end_date: query.end_date,
                skip: query.skip,
                limit: query.limit,
            })
            .await?;

        Ok(VariancePage {
            data,
            count: totals.count,
            total_shortage_cents: totals.total_shortage_cents,
            total_overage_cents: totals.total_overage_cents,
        })
    }

    /// Drops counts for payment methods that do not exist.
    async fn known_methods_only(
        &self,
        physical: BTreeMap<String, Money>,
    ) -> DbResult<BTreeMap<String, Money>> {
        let known: HashSet<String> = self
            .db
            .payment_methods()
            .list_all()
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        Ok(physical
            .into_iter()
            .filter(|(method_id, _)| {
                let exists = known.contains(method_id);
                if !exists {
                    warn!(payment_method_id = %method_id, "Skipping physical count for unknown payment method");
                }
                exists
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
