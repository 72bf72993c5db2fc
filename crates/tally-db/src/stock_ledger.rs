//! # Stock Ledger
//!
//! Pessimistically locked stock mutations.
//!
//! ## Lease Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stock Lease Lifetime                              │
//! │                                                                         │
//! │  pool.begin()                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock_and_get(&mut *tx, id)                                            │
//! │       │  UPDATE products SET current_stock = current_stock ...         │
//! │       │  RETURNING *            ← takes SQLite's write lock            │
//! │       │                                                                 │
//! │       │         other sale/restore: blocks in busy_timeout             │
//! │       ▼                                                                 │
//! │  decrement(..) / restore(..)    ← reads the leased row, never stale    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()  or  drop(tx)      ← the only ways the lease ends         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes the enclosing transaction's connection. The lease
//! must be the transaction's first statement: a deferred transaction that
//! reads before it writes can fail with `SQLITE_BUSY_SNAPSHOT` instead of
//! waiting.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CoreError, Product};

/// Stock operations bound to a transaction.
#[derive(Debug, Clone, Copy)]
pub struct StockLedger;

impl StockLedger {
    /// Takes the lease on `product_id` and returns the row, whatever its status.
    ///
    /// `None` if the product does not exist.
    pub async fn lease(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Option<Product>> {
        debug!(product_id = %product_id, "Leasing product row");

        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET current_stock = current_stock WHERE id = ?1 RETURNING *",
        )
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        Ok(product)
    }

    /// Takes the lease on a sellable product.
    ///
    /// ## Errors
    /// - `NotFound` if the product does not exist
    /// - `Inactive` if its status is not `active`
    pub async fn lock_and_get(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Product> {
        let product = Self::lease(conn, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        if !product.is_active() {
            return Err(CoreError::Inactive {
                entity: "Product",
                id: product.id,
            }
            .into());
        }

        Ok(product)
    }

    /// Removes `quantity` units from a leased product.
    ///
    /// `product` is updated in place to the new stock level.
    pub async fn decrement(
        conn: &mut SqliteConnection,
        product: &mut Product,
        quantity: i64,
    ) -> DbResult<()> {
        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.current_stock,
                requested: quantity,
            }
            .into());
        }

        Self::apply(conn, product, -quantity).await
    }

    /// Puts `quantity` units back on a leased product (sale deleted or voided).
    pub async fn restore(
        conn: &mut SqliteConnection,
        product: &mut Product,
        quantity: i64,
    ) -> DbResult<()> {
        Self::apply(conn, product, quantity).await
    }

    async fn apply(conn: &mut SqliteConnection, product: &mut Product, delta: i64) -> DbResult<()> {
        let now = Utc::now();

        debug!(product_id = %product.id, delta = delta, "Updating stock");

        let stock: i64 = sqlx::query_scalar(
            r#"
            UPDATE products
            SET current_stock = current_stock + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING current_stock
            "#,
        )
        .bind(&product.id)
        .bind(delta)
        .bind(now)
        .fetch_one(conn)
        .await?;

        product.current_stock = stock;
        product.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_support::{insert_product, memory_db};
    use tally_core::ProductStatus;

    #[tokio::test]
    async fn test_decrement_and_restore() {
        let db = memory_db().await;
        let product = insert_product(&db, 10, 10_000, ProductStatus::Active).await;

        let mut tx = db.pool().begin().await.unwrap();
        let mut leased = StockLedger::lock_and_get(&mut *tx, &product.id).await.unwrap();
        StockLedger::decrement(&mut *tx, &mut leased, 3).await.unwrap();
        assert_eq!(leased.current_stock, 7);
        StockLedger::restore(&mut *tx, &mut leased, 1).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 8);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_row_untouched() {
        let db = memory_db().await;
        let product = insert_product(&db, 10, 10_000, ProductStatus::Active).await;

        let mut tx = db.pool().begin().await.unwrap();
        let mut leased = StockLedger::lock_and_get(&mut *tx, &product.id).await.unwrap();
        let err = StockLedger::decrement(&mut *tx, &mut leased, 11).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            })
        ));
        drop(tx);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 10);
    }

    #[tokio::test]
    async fn test_lock_rejects_missing_and_inactive() {
        let db = memory_db().await;
        let inactive = insert_product(&db, 5, 1_000, ProductStatus::Discontinued).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(matches!(
            StockLedger::lock_and_get(&mut *tx, "missing").await,
            Err(DbError::Domain(CoreError::NotFound { .. }))
        ));
        assert!(matches!(
            StockLedger::lock_and_get(&mut *tx, &inactive.id).await,
            Err(DbError::Domain(CoreError::Inactive { .. }))
        ));

        // Restores still reach inactive products
        assert!(StockLedger::lease(&mut *tx, &inactive.id).await.unwrap().is_some());
    }
}
