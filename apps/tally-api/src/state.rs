//! Shared application state handed to every handler.

use std::sync::Arc;

use tally_db::{
    Database, NotificationSink, ReconciliationEngine, SaleProcessor, TillShiftManager,
    TracingNotifier,
};

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// Services built once at startup. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub sales: SaleProcessor,
    pub tills: TillShiftManager,
    pub reconciliation: ReconciliationEngine,
    pub jwt: JwtManager,
}

impl AppState {
    /// Wires the services with the default logging notifier.
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        Self::with_notifier(db, config, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(
        db: Database,
        config: &ApiConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        AppState {
            sales: SaleProcessor::new(db.clone()),
            tills: TillShiftManager::new(db.clone()),
            reconciliation: ReconciliationEngine::new(db.clone())
                .with_threshold(config.variance_threshold)
                .with_notifier(notifier),
            jwt: JwtManager::new(&config.jwt_secret),
            db,
        }
    }
}
