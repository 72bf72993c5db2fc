//! # tally-db: Database Layer and Transactional Engines for Tally POS
//!
//! SQLite storage through sqlx, plus the services that turn each sale,
//! till transition and reconciliation into a single transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /api/v1/sales)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SaleProcessor │    │ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ TillShiftMgr  │    │ TillShiftRepo │    │   _schema    │  │   │
//! │  │   │ Reconciliation│    │ ...           │    │              │  │   │
//! │  │   └──────┬────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          │ StockLedger (lease held until commit)               │   │
//! │  └──────────┼──────────────────────────────────────────────────────┘   │
//! │             ▼                                                           │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                SQLite Database (WAL, busy timeout)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`stock_ledger`] - Locked stock mutations
//! - [`service`] - Sale, till and reconciliation engines
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, TillShiftManager};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//!
//! let tills = TillShiftManager::new(db.clone());
//! let status = tills.till_status().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod stock_ledger;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use stock_ledger::StockLedger;

// Repository re-exports for convenience
pub use repository::debt::DebtRepository;
pub use repository::payment_method::PaymentMethodRepository;
pub use repository::product::ProductRepository;
pub use repository::reconciliation::{ReconciliationRepository, VarianceReportRow};
pub use repository::sale::SaleRepository;
pub use repository::till::TillShiftRepository;

// Services
pub use service::notify::{NotificationSink, TracingNotifier};
pub use service::reconciliation::{
    ReconcileOutcome, ReconcileRequest, ReconciliationEngine, SystemCountCalculator,
    SystemCountsView, VariancePage, VarianceQuery,
};
pub use service::sale::{
    SaleDetail, SalePage, SaleProcessor, SaleQuery, SaleReceipt, SimpleSaleRequest, SplitSaleRequest,
};
pub use service::till::{
    CloseTillRequest, OpenTillRequest, ShiftPage, ShiftSummary, TillShiftManager, TillStatusView,
};
