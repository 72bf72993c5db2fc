//! # Debt Repository
//!
//! Customer debts opened by split-payment sales that were not paid in full.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::Debt;

/// Repository for debt database operations.
#[derive(Debug, Clone)]
pub struct DebtRepository {
    pool: SqlitePool,
}

impl DebtRepository {
    /// Creates a new DebtRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DebtRepository { pool }
    }

    /// Debt opened by a sale, if any.
    pub async fn get_for_sale(&self, sale_id: &str) -> DbResult<Option<Debt>> {
        let debt = sqlx::query_as::<_, Debt>("SELECT * FROM debts WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(debt)
    }

    /// A customer's debts, newest first.
    pub async fn list_for_customer(&self, customer_name: &str) -> DbResult<Vec<Debt>> {
        let debts = sqlx::query_as::<_, Debt>(
            "SELECT * FROM debts WHERE customer_name = ?1 ORDER BY julianday(debt_date) DESC",
        )
        .bind(customer_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(debts)
    }
}

/// Contact recorded on the customer's most recent debt that has one.
pub(crate) async fn latest_contact(
    conn: &mut SqliteConnection,
    customer_name: &str,
) -> DbResult<Option<String>> {
    let contact = sqlx::query_scalar::<_, String>(
        r#"
        SELECT customer_contact FROM debts
        WHERE customer_name = ?1 AND customer_contact IS NOT NULL
        ORDER BY julianday(debt_date) DESC
        LIMIT 1
        "#,
    )
    .bind(customer_name)
    .fetch_optional(conn)
    .await?;

    Ok(contact)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, debt: &Debt) -> DbResult<()> {
    debug!(id = %debt.id, customer = %debt.customer_name, balance = debt.balance_cents, "Inserting debt");

    sqlx::query(
        r#"
        INSERT INTO debts (
            id, customer_name, customer_contact, sale_id, amount_cents,
            amount_paid_cents, balance_cents, debt_date, due_date, status,
            notes, created_by_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&debt.id)
    .bind(&debt.customer_name)
    .bind(&debt.customer_contact)
    .bind(&debt.sale_id)
    .bind(debt.amount_cents)
    .bind(debt.amount_paid_cents)
    .bind(debt.balance_cents)
    .bind(debt.debt_date)
    .bind(debt.due_date)
    .bind(debt.status)
    .bind(&debt.notes)
    .bind(&debt.created_by_id)
    .execute(conn)
    .await?;

    Ok(())
}
