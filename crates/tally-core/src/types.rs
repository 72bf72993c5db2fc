//! # Domain Types
//!
//! Records the engine reads and writes.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  SalePayment    │       │
//! │  │  current_stock  │◄──│  product_id     │◄──│  sale_id        │       │
//! │  │  selling_price  │   │  total_amount   │   │  method, amount │       │
//! │  └─────────────────┘   │  payment_method │   └─────────────────┘       │
//! │                        └────────┬────────┘                              │
//! │                                 │ shortfall with customer               │
//! │                                 ▼                                       │
//! │                        ┌─────────────────┐                              │
//! │                        │      Debt       │                              │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  TillShift ──► ShiftReconciliation ──► PaymentMethodReconciliation (n) │
//! │      └───────► CashierVariance (1)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money columns are stored as `*_cents` integers; use the `Money` accessors
//! for arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::reconciliation::VarianceType;

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Product
// =============================================================================

/// Catalog status of a product. Only `Active` products can be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
    Discontinued,
}

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub selling_price_cents: i64,
    pub buying_price_cents: Option<i64>,
    /// Units on hand. Never negative.
    pub current_stock: i64,
    pub reorder_level: i64,
    pub status: ProductStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Checks if `quantity` units can come out of stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.current_stock >= quantity
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// A way of paying (Cash, M-Pesa, Credit, ...). Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

// =============================================================================
// Sale
// =============================================================================

/// A single-product sale.
///
/// `payment_method_id` is the primary method; split payments live in
/// [`SalePayment`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_amount_cents: i64,
    pub payment_method_id: String,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub created_by_id: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub voided: bool,
    pub void_reason: Option<String>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// One tender line of a split-payment sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub payment_method_id: String,
    pub amount_cents: i64,
    pub reference_number: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SalePayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Debt
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// Unpaid remainder of a customer-attributed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Debt {
    pub id: String,
    pub customer_name: String,
    pub customer_contact: Option<String>,
    /// Cleared if the originating sale is deleted.
    pub sale_id: Option<String>,
    pub amount_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub debt_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub status: DebtStatus,
    pub notes: Option<String>,
    pub created_by_id: String,
}

impl Debt {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Reconciliation Records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    InProgress,
    Completed,
    Reviewed,
}

/// Header row written once per reconciled shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShiftReconciliation {
    pub id: String,
    pub till_shift_id: String,
    #[ts(as = "String")]
    pub shift_date: DateTime<Utc>,
    pub opening_cash_float_cents: i64,
    pub closing_cash_float_cents: i64,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub status: ReconciliationStatus,
    pub notes: Option<String>,
    pub created_by_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// System vs physical count for one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethodReconciliation {
    pub id: String,
    pub shift_reconciliation_id: String,
    pub payment_method_id: String,
    pub system_count_cents: i64,
    pub physical_count_cents: i64,
    /// physical - system
    pub variance_cents: i64,
}

/// Per-shift variance attributed to the cashier who opened it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashierVariance {
    pub id: String,
    pub till_shift_id: String,
    pub cashier_id: String,
    /// Magnitude, always >= 0. Direction is in `variance_type`.
    pub total_variance_cents: i64,
    pub variance_type: VarianceType,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
