//! Fixtures shared by the crate's unit tests.

use chrono::{DateTime, Utc};

use crate::pool::{Database, DbConfig};
use tally_core::{new_id, Actor, PaymentMethod, Product, ProductStatus, ShiftType, TillShift, TillStatus};

pub const CASH: &str = "pm-cash";
pub const MPESA: &str = "pm-mpesa";
pub const CREDIT: &str = "pm-credit";

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database with several pooled connections.
pub async fn file_db(dir: &tempfile::TempDir) -> Database {
    Database::new(DbConfig::new(dir.path().join("tally.db")).max_connections(8))
        .await
        .unwrap()
}

pub async fn insert_product(
    db: &Database,
    stock: i64,
    price_cents: i64,
    status: ProductStatus,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: new_id(),
        name: format!("Product {}", &new_id()[..8]),
        selling_price_cents: price_cents,
        buying_price_cents: Some(price_cents / 2),
        current_stock: stock,
        reorder_level: 5,
        status,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap()
}

/// Cash, M-Pesa and Credit, all active.
pub async fn seed_methods(db: &Database) {
    for (id, name) in [(CASH, "Cash"), (MPESA, "M-Pesa"), (CREDIT, "Credit")] {
        db.payment_methods()
            .insert(&PaymentMethod {
                id: id.to_string(),
                name: name.to_string(),
                description: None,
                is_active: true,
            })
            .await
            .unwrap();
    }
}

/// Inserts an open shift directly, bypassing the till rules.
pub async fn insert_open_shift(
    db: &Database,
    actor: &Actor,
    shift_type: ShiftType,
    opening_time: DateTime<Utc>,
) -> TillShift {
    let shift = TillShift {
        id: new_id(),
        shift_type,
        status: TillStatus::Open,
        opening_cash_float_cents: 0,
        opening_balance_cents: None,
        opening_time,
        closing_time: None,
        closing_cash_float_cents: None,
        opened_by_id: actor.user_id.clone(),
        opened_by_name: actor.name.clone(),
        closed_by_id: None,
        notes: None,
    };
    db.till_shifts().insert(&shift).await.unwrap();
    shift
}

/// Open day shift that started a minute ago.
pub async fn open_day_shift(db: &Database, actor: &Actor) -> TillShift {
    insert_open_shift(db, actor, ShiftType::Day, Utc::now() - chrono::Duration::minutes(1)).await
}
