//! # tally-api
//!
//! JSON over HTTP for the till and sale engine.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/v1/sales                                                    │
//! │       │                                                                 │
//! │       ├── TraceLayer            request span                           │
//! │       ├── CurrentUser           Bearer JWT → Actor (401 on failure)    │
//! │       ├── Json<SaleBody>        body → request struct                  │
//! │       ▼                                                                 │
//! │  SaleProcessor (tally-db)       one transaction                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError                       DbError/CoreError → status + code      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
