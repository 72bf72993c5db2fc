//! # Reconciliation Repository
//!
//! Shift reconciliation headers, per-method lines and cashier variances.
//!
//! ## Records Per Reconciled Shift
//! ```text
//! till_shifts (1) ──► shift_reconciliations (1) ──► payment_method_reconciliations (n)
//!        └──────────► cashier_variances (1)
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CashierVariance, PaymentMethodReconciliation, ShiftReconciliation, ShiftType};

/// Repository for reconciliation database operations.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    pool: SqlitePool,
}

/// Filter for the cashier variance report.
#[derive(Debug, Clone, Default)]
pub struct VarianceFilter {
    pub cashier_id: Option<String>,
    /// Inclusive, compared against the record's creation date.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub skip: i64,
    pub limit: i64,
}

/// A variance joined with the shift it came from.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VarianceReportRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub variance: CashierVariance,
    pub cashier_name: String,
    pub shift_type: ShiftType,
}

/// Totals over the whole filtered set, not just the current page.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct VarianceTotals {
    pub count: i64,
    pub total_shortage_cents: i64,
    pub total_overage_cents: i64,
}

impl ReconciliationRepository {
    /// Creates a new ReconciliationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReconciliationRepository { pool }
    }

    pub async fn get_for_shift(&self, till_shift_id: &str) -> DbResult<Option<ShiftReconciliation>> {
        let header = sqlx::query_as::<_, ShiftReconciliation>(
            "SELECT * FROM shift_reconciliations WHERE till_shift_id = ?1",
        )
        .bind(till_shift_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(header)
    }

    pub async fn lines(&self, reconciliation_id: &str) -> DbResult<Vec<PaymentMethodReconciliation>> {
        let lines = sqlx::query_as::<_, PaymentMethodReconciliation>(
            r#"
            SELECT * FROM payment_method_reconciliations
            WHERE shift_reconciliation_id = ?1
            ORDER BY payment_method_id
            "#,
        )
        .bind(reconciliation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    pub async fn variance_for_shift(&self, till_shift_id: &str) -> DbResult<Option<CashierVariance>> {
        let variance = sqlx::query_as::<_, CashierVariance>(
            "SELECT * FROM cashier_variances WHERE till_shift_id = ?1",
        )
        .bind(till_shift_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variance)
    }

    /// Cashier variance report page, newest first.
    pub async fn list_variances(
        &self,
        filter: &VarianceFilter,
    ) -> DbResult<(Vec<VarianceReportRow>, VarianceTotals)> {
        debug!(cashier_id = ?filter.cashier_id, skip = filter.skip, limit = filter.limit, "Listing cashier variances");

        let rows = sqlx::query_as::<_, VarianceReportRow>(
            r#"
            SELECT cv.*, ts.opened_by_name AS cashier_name, ts.shift_type AS shift_type
            FROM cashier_variances cv
            JOIN till_shifts ts ON ts.id = cv.till_shift_id
            WHERE (?1 IS NULL OR cv.cashier_id = ?1)
              AND (?2 IS NULL OR date(cv.created_at) >= ?2)
              AND (?3 IS NULL OR date(cv.created_at) <= ?3)
            ORDER BY julianday(cv.created_at) DESC
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(&filter.cashier_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.pool)
        .await?;

        let totals = sqlx::query_as::<_, VarianceTotals>(
            r#"
            SELECT
                COUNT(*) AS count,
                COALESCE(SUM(CASE WHEN variance_type = 'shortage' THEN total_variance_cents END), 0)
                    AS total_shortage_cents,
                COALESCE(SUM(CASE WHEN variance_type = 'overage' THEN total_variance_cents END), 0)
                    AS total_overage_cents
            FROM cashier_variances cv
            WHERE (?1 IS NULL OR cv.cashier_id = ?1)
              AND (?2 IS NULL OR date(cv.created_at) >= ?2)
              AND (?3 IS NULL OR date(cv.created_at) <= ?3)
            "#,
        )
        .bind(&filter.cashier_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, totals))
    }
}

// =============================================================================
// Transactional Writes
// =============================================================================

pub(crate) async fn insert_header(
    conn: &mut SqliteConnection,
    header: &ShiftReconciliation,
) -> DbResult<()> {
    debug!(id = %header.id, till_shift_id = %header.till_shift_id, "Inserting shift reconciliation");

    sqlx::query(
        r#"
        INSERT INTO shift_reconciliations (
            id, till_shift_id, shift_date, opening_cash_float_cents, closing_cash_float_cents,
            total_sales_cents, total_transactions, status, notes, created_by_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&header.id)
    .bind(&header.till_shift_id)
    .bind(header.shift_date)
    .bind(header.opening_cash_float_cents)
    .bind(header.closing_cash_float_cents)
    .bind(header.total_sales_cents)
    .bind(header.total_transactions)
    .bind(header.status)
    .bind(&header.notes)
    .bind(&header.created_by_id)
    .bind(header.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_line(
    conn: &mut SqliteConnection,
    line: &PaymentMethodReconciliation,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payment_method_reconciliations (
            id, shift_reconciliation_id, payment_method_id,
            system_count_cents, physical_count_cents, variance_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&line.id)
    .bind(&line.shift_reconciliation_id)
    .bind(&line.payment_method_id)
    .bind(line.system_count_cents)
    .bind(line.physical_count_cents)
    .bind(line.variance_cents)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_variance(
    conn: &mut SqliteConnection,
    variance: &CashierVariance,
) -> DbResult<()> {
    debug!(
        till_shift_id = %variance.till_shift_id,
        variance_type = %variance.variance_type,
        total_variance_cents = variance.total_variance_cents,
        "Inserting cashier variance"
    );

    sqlx::query(
        r#"
        INSERT INTO cashier_variances (
            id, till_shift_id, cashier_id, total_variance_cents, variance_type, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&variance.id)
    .bind(&variance.till_shift_id)
    .bind(&variance.cashier_id)
    .bind(variance.total_variance_cents)
    .bind(variance.variance_type)
    .bind(&variance.notes)
    .bind(variance.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
