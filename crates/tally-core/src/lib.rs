//! # tally-core: Pure Business Logic for Tally POS
//!
//! Every rule of the sale, till and reconciliation engine that can be
//! decided without storage. The transactional engines in `tally-db` load
//! state, call into this crate, then persist the outcome.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-api (axum)                             │   │
//! │  │    /till/open ──► /sales ──► /till/close ──► /till/reconcile   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-db (services + repositories)              │   │
//! │  │    StockLedger, SaleProcessor, TillShiftManager, Reconciler     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌────────────────┐      │   │
//! │  │   │  money  │ │  till   │ │ tender  │ │ reconciliation │      │   │
//! │  │   │  Money  │ │ states  │ │ settle  │ │ system counts  │      │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └────────────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic and the 0.01 tolerance
//! - [`till`] - Till shift state machine and open/close rules
//! - [`tender`] - Split-payment settlement and primary method resolution
//! - [`reconciliation`] - System counts and variance classification
//! - [`actor`] - The authenticated caller and its capabilities
//! - [`types`] - Stored records (Product, Sale, Debt, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::tender::settle;
//!
//! // 1000.00 sale paid 600.00 + 300.00 by a named customer
//! let settlement = settle(
//!     Money::from_cents(100_000),
//!     &[Money::from_cents(60_000), Money::from_cents(30_000)],
//!     true,
//! )
//! .unwrap();
//!
//! assert!(settlement.creates_debt());
//! assert_eq!(settlement.shortfall.to_decimal_string(), "100.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actor;
pub mod error;
pub mod money;
pub mod reconciliation;
pub mod tender;
pub mod till;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use actor::Actor;
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use reconciliation::{SystemCount, VarianceType};
pub use till::{ShiftType, TillShift, TillStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single sale line.
///
/// Catches typos like 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest amount accepted for any single money input (1,000,000,000.00).
///
/// Keeps `MAX_AMOUNT_CENTS * MAX_ITEM_QUANTITY` well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Maximum length of notes, customer names and reference numbers.
pub const MAX_NOTES_LEN: usize = 1_000;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Largest page a list endpoint will return.
pub const MAX_PAGE_LIMIT: i64 = 1_000;
