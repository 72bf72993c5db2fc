//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Repository structs (pool-backed)      Free functions (connection)      │
//! │  ──────────────────────────────        ────────────────────────────     │
//! │  db.till_shifts().current_open()       sale::insert_sale(&mut *tx, ..) │
//! │  db.sales().payments_for(id)           till::mark_reconciled(..)        │
//! │  db.reconciliations().list_..()        debt::insert(..)                 │
//! │                                                                         │
//! │  Reads outside a transaction           Writes and reads that must share │
//! │  (precondition checks, reports)        one transaction in a service     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product lookups and inserts
//! - [`PaymentMethodRepository`](payment_method::PaymentMethodRepository) - Payment methods
//! - [`SaleRepository`](sale::SaleRepository) - Sales, split payments, shift windows
//! - [`DebtRepository`](debt::DebtRepository) - Customer debts
//! - [`TillShiftRepository`](till::TillShiftRepository) - Till shifts
//! - [`ReconciliationRepository`](reconciliation::ReconciliationRepository) - Reconciliation records

pub mod debt;
pub mod payment_method;
pub mod product;
pub mod reconciliation;
pub mod sale;
pub mod till;
