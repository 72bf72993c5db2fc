//! # Payment Method Repository
//!
//! Payment methods are reference data: the engine reads them and the seed
//! binary inserts them.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::PaymentMethod;

/// Repository for payment method database operations.
#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    pool: SqlitePool,
}

impl PaymentMethodRepository {
    /// Creates a new PaymentMethodRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentMethodRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PaymentMethod>> {
        let method =
            sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(method)
    }

    /// Active methods, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<PaymentMethod>> {
        let mut conn = self.pool.acquire().await?;
        list_active(&mut conn).await
    }

    /// Every method, active or not, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<PaymentMethod>> {
        let methods =
            sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(methods)
    }

    pub async fn insert(&self, method: &PaymentMethod) -> DbResult<()> {
        debug!(id = %method.id, name = %method.name, "Inserting payment method");

        sqlx::query(
            "INSERT INTO payment_methods (id, name, description, is_active) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&method.id)
        .bind(&method.name)
        .bind(&method.description)
        .bind(method.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Active methods on an existing connection (used inside reconciliation).
pub(crate) async fn list_active(conn: &mut SqliteConnection) -> DbResult<Vec<PaymentMethod>> {
    let methods = sqlx::query_as::<_, PaymentMethod>(
        "SELECT * FROM payment_methods WHERE is_active = 1 ORDER BY name",
    )
    .fetch_all(conn)
    .await?;

    Ok(methods)
}
