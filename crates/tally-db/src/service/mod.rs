//! # Service Module
//!
//! The transactional engines. Each public operation runs its writes in one
//! database transaction and either commits everything or nothing.
//!
//! - [`SaleProcessor`](sale::SaleProcessor) - Simple and split-payment sales, deletes, voids
//! - [`TillShiftManager`](till::TillShiftManager) - Open/close shifts, status, summaries
//! - [`SystemCountCalculator`](reconciliation::SystemCountCalculator) - Expected totals per method
//! - [`ReconciliationEngine`](reconciliation::ReconciliationEngine) - Reconcile and variance report
//! - [`NotificationSink`](notify::NotificationSink) - Where variance alerts go

pub mod notify;
pub mod reconciliation;
pub mod sale;
pub mod till;
