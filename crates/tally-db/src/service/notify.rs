//! # Notification Hook
//!
//! Where variance alerts go once a reconciliation has committed.

use std::fmt::Debug;
use tracing::warn;

use tally_core::reconciliation::VarianceAlert;

/// Receives alerts raised by the reconciliation engine.
///
/// Called after commit; an implementation must not block for long.
pub trait NotificationSink: Send + Sync + Debug {
    fn variance_alert(&self, alert: &VarianceAlert);
}

/// Default sink: a WARN log line with the alert's fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn variance_alert(&self, alert: &VarianceAlert) {
        warn!(
            till_shift_id = %alert.till_shift_id,
            reconciliation_id = %alert.reconciliation_id,
            cashier_id = %alert.cashier_id,
            cashier_name = %alert.cashier_name,
            total_variance = %alert.total_variance,
            variance_type = %alert.variance_type,
            threshold = %alert.threshold,
            "Cash variance exceeds threshold"
        );
    }
}
