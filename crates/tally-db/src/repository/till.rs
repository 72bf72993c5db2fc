//! # Till Shift Repository
//!
//! Reads and guarded writes for till shifts.
//!
//! Every status change is a single `UPDATE ... WHERE status = <expected>`:
//! the affected-row count tells the caller whether it won the transition.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{TillShift, TillStatus};

/// Repository for till shift database operations.
#[derive(Debug, Clone)]
pub struct TillShiftRepository {
    pool: SqlitePool,
}

impl TillShiftRepository {
    /// Creates a new TillShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TillShiftRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TillShift>> {
        let shift = sqlx::query_as::<_, TillShift>("SELECT * FROM till_shifts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// The open shift, if any. There is at most one.
    pub async fn current_open(&self) -> DbResult<Option<TillShift>> {
        let shift =
            sqlx::query_as::<_, TillShift>("SELECT * FROM till_shifts WHERE status = 'open'")
                .fetch_optional(&self.pool)
                .await?;

        Ok(shift)
    }

    /// Most recently closed shift, whether reconciled or not.
    pub async fn last_terminal(&self) -> DbResult<Option<TillShift>> {
        let shift = sqlx::query_as::<_, TillShift>(
            r#"
            SELECT * FROM till_shifts
            WHERE status IN ('closed', 'reconciled')
            ORDER BY julianday(closing_time) DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Shifts newest first, optionally restricted to one opener and/or status.
    ///
    /// Returns the page and the total matching count.
    pub async fn list(
        &self,
        opened_by_id: Option<&str>,
        status: Option<TillStatus>,
        skip: i64,
        limit: i64,
    ) -> DbResult<(Vec<TillShift>, i64)> {
        let shifts = sqlx::query_as::<_, TillShift>(
            r#"
            SELECT * FROM till_shifts
            WHERE (?1 IS NULL OR opened_by_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY julianday(opening_time) DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(opened_by_id)
        .bind(status)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM till_shifts
            WHERE (?1 IS NULL OR opened_by_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            "#,
        )
        .bind(opened_by_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((shifts, count))
    }

    /// Inserts a new open shift.
    ///
    /// A second open shift violates `idx_till_shifts_one_open`.
    pub async fn insert(&self, shift: &TillShift) -> DbResult<()> {
        debug!(id = %shift.id, shift_type = %shift.shift_type, "Inserting till shift");

        sqlx::query(
            r#"
            INSERT INTO till_shifts (
                id, shift_type, status, opening_cash_float_cents, opening_balance_cents,
                opening_time, closing_time, closing_cash_float_cents,
                opened_by_id, opened_by_name, closed_by_id, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&shift.id)
        .bind(shift.shift_type)
        .bind(shift.status)
        .bind(shift.opening_cash_float_cents)
        .bind(shift.opening_balance_cents)
        .bind(shift.opening_time)
        .bind(shift.closing_time)
        .bind(shift.closing_cash_float_cents)
        .bind(&shift.opened_by_id)
        .bind(&shift.opened_by_name)
        .bind(&shift.closed_by_id)
        .bind(&shift.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Takes the write lock and returns the open shift, if any.
///
/// Must be the first statement of its transaction: sale transactions that
/// already hold the lock commit before this returns, and new ones wait.
pub(crate) async fn lock_open(conn: &mut SqliteConnection) -> DbResult<Option<TillShift>> {
    let shift = sqlx::query_as::<_, TillShift>(
        "UPDATE till_shifts SET status = status WHERE status = 'open' RETURNING *",
    )
    .fetch_optional(conn)
    .await?;

    Ok(shift)
}

/// `open → closed`. Returns false if the shift was no longer open.
pub(crate) async fn close(
    conn: &mut SqliteConnection,
    id: &str,
    closing_time: DateTime<Utc>,
    closing_cash_float_cents: i64,
    closed_by_id: &str,
    notes: Option<&str>,
) -> DbResult<bool> {
    debug!(id = %id, "Closing till shift");

    let result = sqlx::query(
        r#"
        UPDATE till_shifts
        SET status = 'closed',
            closing_time = ?2,
            closing_cash_float_cents = ?3,
            closed_by_id = ?4,
            notes = COALESCE(?5, notes)
        WHERE id = ?1 AND status = 'open'
        "#,
    )
    .bind(id)
    .bind(closing_time)
    .bind(closing_cash_float_cents)
    .bind(closed_by_id)
    .bind(notes)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// True while some shift is open. Used inside sale transactions after the
/// stock lease is held.
pub(crate) async fn open_exists(conn: &mut SqliteConnection) -> DbResult<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM till_shifts WHERE status = 'open')")
            .fetch_one(conn)
            .await?;

    Ok(exists)
}

/// `closed → reconciled`. Returns false if the shift was not `closed`.
pub(crate) async fn mark_reconciled(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE till_shifts SET status = 'reconciled' WHERE id = ?1 AND status = 'closed'",
    )
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<TillShift>> {
    let shift = sqlx::query_as::<_, TillShift>("SELECT * FROM till_shifts WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(shift)
}
