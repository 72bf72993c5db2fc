//! HTTP routes, all nested under `/api/v1`.

pub mod sales;
pub mod till;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(till::routes())
        .merge(sales::routes());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.db.health_check().await {
        "connected"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok",
        database,
    })
}
