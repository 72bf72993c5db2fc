//! # Sale Repository
//!
//! Database operations for sales and their split-payment rows.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. RECORD (inside the sale transaction)                               │
//! │     └── insert_sale() → Sale                                           │
//! │     └── insert_payment() → SalePayment (split sales only)              │
//! │                                                                         │
//! │  2. (OPTIONAL) VOID                                                    │
//! │     └── mark_voided() → Sale { voided: true }, stock restored          │
//! │                                                                         │
//! │  3. (OPTIONAL) DELETE                                                  │
//! │     └── delete_returning() → payments cascade, debt unlinked           │
//! │                                                                         │
//! │  History reads:                                                        │
//! │     └── list() → filtered page, newest first, with the full count      │
//! │                                                                         │
//! │  Shift window reads feed system counts and summaries:                  │
//! │     └── load_window() → non-voided sales by one cashier in [start,end] │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use tally_core::money::Money;
use tally_core::reconciliation::{SaleTender, SplitAmount};
use tally_core::{Sale, SalePayment};

/// Filters for the sales history. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub cashier_id: Option<String>,
    pub product_id: Option<String>,
    /// Matches the sale's primary payment method.
    pub payment_method_id: Option<String>,
    /// Inclusive, compared against the sale date.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub skip: i64,
    pub limit: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// One page of sales, newest first, and the size of the whole filtered set.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<(Vec<Sale>, i64)> {
        debug!(cashier_id = ?filter.cashier_id, skip = filter.skip, limit = filter.limit, "Listing sales");

        const CONDITIONS: &str = r#"
            WHERE (?1 IS NULL OR created_by_id = ?1)
              AND (?2 IS NULL OR product_id = ?2)
              AND (?3 IS NULL OR payment_method_id = ?3)
              AND (?4 IS NULL OR date(sale_date) >= ?4)
              AND (?5 IS NULL OR date(sale_date) <= ?5)
        "#;

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT * FROM sales {CONDITIONS} ORDER BY julianday(sale_date) DESC, rowid DESC LIMIT ?6 OFFSET ?7"
        ))
        .bind(&filter.cashier_id)
        .bind(&filter.product_id)
        .bind(&filter.payment_method_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sales {CONDITIONS}"))
            .bind(&filter.cashier_id)
            .bind(&filter.product_id)
            .bind(&filter.payment_method_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_one(&self.pool)
            .await?;

        Ok((sales, count))
    }

    /// Split-payment rows of a sale, in entry order.
    pub async fn payments_for(&self, sale_id: &str) -> DbResult<Vec<SalePayment>> {
        let payments = sqlx::query_as::<_, SalePayment>(
            "SELECT * FROM sale_payments WHERE sale_id = ?1 ORDER BY julianday(created_at), rowid",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

// =============================================================================
// Shift Window
// =============================================================================

/// The sales that belong to a till shift.
#[derive(Debug, Clone)]
pub struct ShiftWindow {
    pub cashier_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct WindowSaleRow {
    id: String,
    payment_method_id: String,
    total_amount_cents: i64,
    quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct WindowSplitRow {
    sale_id: String,
    payment_method_id: String,
    amount_cents: i64,
}

/// Non-voided sales of a shift with their splits attached.
#[derive(Debug, Clone, Default)]
pub struct SaleWindow {
    pub tenders: Vec<SaleTender>,
    pub total_sales: Money,
    pub items_sold: i64,
}

impl SaleWindow {
    pub fn transactions(&self) -> i64 {
        self.tenders.len() as i64
    }
}

/// Loads the shift window on an existing connection.
///
/// Inside a transaction this reads the same snapshot the writes will commit
/// against.
pub(crate) async fn load_window(
    conn: &mut SqliteConnection,
    window: &ShiftWindow,
) -> DbResult<SaleWindow> {
    debug!(
        cashier_id = %window.cashier_id,
        start = %window.start,
        end = %window.end,
        "Loading shift sales window"
    );

    let sales = sqlx::query_as::<_, WindowSaleRow>(
        r#"
        SELECT id, payment_method_id, total_amount_cents, quantity
        FROM sales
        WHERE created_by_id = ?1
          AND voided = 0
          AND julianday(sale_date) >= julianday(?2)
          AND julianday(sale_date) <= julianday(?3)
        ORDER BY julianday(sale_date)
        "#,
    )
    .bind(&window.cashier_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_all(&mut *conn)
    .await?;

    let splits = sqlx::query_as::<_, WindowSplitRow>(
        r#"
        SELECT sp.sale_id, sp.payment_method_id, sp.amount_cents
        FROM sale_payments sp
        JOIN sales s ON s.id = sp.sale_id
        WHERE s.created_by_id = ?1
          AND s.voided = 0
          AND julianday(s.sale_date) >= julianday(?2)
          AND julianday(s.sale_date) <= julianday(?3)
        "#,
    )
    .bind(&window.cashier_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_all(&mut *conn)
    .await?;

    let mut splits_by_sale: HashMap<String, Vec<SplitAmount>> = HashMap::new();
    for split in splits {
        splits_by_sale
            .entry(split.sale_id)
            .or_default()
            .push(SplitAmount {
                payment_method_id: split.payment_method_id,
                amount: Money::from_cents(split.amount_cents),
            });
    }

    let mut result = SaleWindow::default();
    for sale in sales {
        result.total_sales += Money::from_cents(sale.total_amount_cents);
        result.items_sold += sale.quantity;
        result.tenders.push(SaleTender {
            splits: splits_by_sale.remove(&sale.id).unwrap_or_default(),
            sale_id: sale.id,
            primary_method_id: sale.payment_method_id,
            total_amount: Money::from_cents(sale.total_amount_cents),
        });
    }

    Ok(result)
}

// =============================================================================
// Transactional Writes
// =============================================================================

pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, product_id = %sale.product_id, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, product_id, quantity, unit_price_cents, total_amount_cents,
            payment_method_id, customer_name, notes, created_by_id, sale_date,
            voided, void_reason
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.product_id)
    .bind(sale.quantity)
    .bind(sale.unit_price_cents)
    .bind(sale.total_amount_cents)
    .bind(&sale.payment_method_id)
    .bind(&sale.customer_name)
    .bind(&sale.notes)
    .bind(&sale.created_by_id)
    .bind(sale.sale_date)
    .bind(sale.voided)
    .bind(&sale.void_reason)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &SalePayment,
) -> DbResult<()> {
    debug!(sale_id = %payment.sale_id, method = %payment.payment_method_id, "Inserting sale payment");

    sqlx::query(
        r#"
        INSERT INTO sale_payments (
            id, sale_id, payment_method_id, amount_cents, reference_number, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(&payment.payment_method_id)
    .bind(payment.amount_cents)
    .bind(&payment.reference_number)
    .bind(payment.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// What a removed or voided sale had taken out of stock.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StockReturn {
    pub product_id: String,
    pub quantity: i64,
    pub voided: bool,
}

/// Deletes a sale; its payments cascade and any debt is unlinked.
///
/// Returns `None` if the sale does not exist. `voided` reports the state
/// before deletion.
pub(crate) async fn delete_returning(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Option<StockReturn>> {
    let removed = sqlx::query_as::<_, StockReturn>(
        "DELETE FROM sales WHERE id = ?1 RETURNING product_id, quantity, voided",
    )
    .bind(sale_id)
    .fetch_optional(conn)
    .await?;

    Ok(removed)
}

/// Marks a not-yet-voided sale as voided.
///
/// `None` if the sale is missing or already voided.
pub(crate) async fn mark_voided(
    conn: &mut SqliteConnection,
    sale_id: &str,
    reason: &str,
) -> DbResult<Option<StockReturn>> {
    let voided = sqlx::query_as::<_, StockReturn>(
        r#"
        UPDATE sales SET voided = 1, void_reason = ?2
        WHERE id = ?1 AND voided = 0
        RETURNING product_id, quantity, voided
        "#,
    )
    .bind(sale_id)
    .bind(reason)
    .fetch_optional(conn)
    .await?;

    Ok(voided)
}

/// `Some(voided)` for an existing sale.
pub(crate) async fn voided_flag(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<bool>> {
    let flag = sqlx::query_scalar::<_, bool>("SELECT voided FROM sales WHERE id = ?1")
        .bind(sale_id)
        .fetch_optional(conn)
        .await?;

    Ok(flag)
}
