//! Till shift and reconciliation endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use tally_core::money::Money;
use tally_core::{ShiftType, TillShift, TillStatus, DEFAULT_PAGE_LIMIT};
use tally_db::{
    CloseTillRequest, OpenTillRequest, ReconcileOutcome, ReconcileRequest, ShiftPage,
    ShiftSummary, SystemCountsView, TillStatusView, VariancePage, VarianceQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/till/open", post(open_till))
        .route("/till/close", post(close_till))
        .route("/till/status", get(till_status))
        .route("/till/current", get(current_shift))
        .route("/till/shifts", get(list_shifts))
        .route("/till/shifts/{id}/summary", get(shift_summary))
        .route("/till/system-counts", get(system_counts))
        .route("/till/reconcile", post(reconcile))
        .route("/till/variances", get(list_variances))
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct OpenTillBody {
    pub shift_type: ShiftType,
    pub opening_cash_float: Money,
    pub opening_balance: Option<Money>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CloseTillBody {
    pub closing_cash_float: Money,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShiftListParams {
    pub status: Option<TillStatus>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct SystemCountParams {
    pub shift_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileBody {
    pub physical_counts: BTreeMap<String, Money>,
    pub notes: Option<String>,
    pub shift_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VarianceParams {
    pub cashier_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

async fn open_till(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<OpenTillBody>,
) -> Result<(StatusCode, Json<TillShift>), ApiError> {
    let shift = state
        .tills
        .open_till(
            &actor,
            OpenTillRequest {
                shift_type: body.shift_type,
                opening_cash_float: body.opening_cash_float,
                opening_balance: body.opening_balance,
                notes: body.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(shift)))
}

async fn close_till(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<CloseTillBody>,
) -> Result<Json<TillShift>, ApiError> {
    let shift = state
        .tills
        .close_till(
            &actor,
            CloseTillRequest {
                closing_cash_float: body.closing_cash_float,
                notes: body.notes,
            },
        )
        .await?;

    Ok(Json(shift))
}

async fn till_status(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<TillStatusView>, ApiError> {
    Ok(Json(state.tills.till_status().await?))
}

async fn current_shift(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<TillShift>, ApiError> {
    Ok(Json(state.tills.current_shift().await?))
}

async fn list_shifts(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<ShiftListParams>,
) -> Result<Json<ShiftPage>, ApiError> {
    let page = state
        .tills
        .list_shifts(&actor, params.status, params.skip, params.limit)
        .await?;

    Ok(Json(page))
}

async fn shift_summary(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ShiftSummary>, ApiError> {
    Ok(Json(state.tills.shift_summary(&actor, &id).await?))
}

async fn system_counts(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<SystemCountParams>,
) -> Result<Json<SystemCountsView>, ApiError> {
    let view = state
        .reconciliation
        .get_system_counts(&actor, params.shift_id.as_deref())
        .await?;

    Ok(Json(view))
}

async fn reconcile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<ReconcileBody>,
) -> Result<Json<ReconcileOutcome>, ApiError> {
    let outcome = state
        .reconciliation
        .reconcile(
            &actor,
            ReconcileRequest {
                physical_counts: body.physical_counts,
                notes: body.notes,
                shift_id: body.shift_id,
            },
        )
        .await?;

    Ok(Json(outcome))
}

async fn list_variances(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<VarianceParams>,
) -> Result<Json<VariancePage>, ApiError> {
    let page = state
        .reconciliation
        .list_cashier_variances(
            &actor,
            VarianceQuery {
                cashier_id: params.cashier_id,
                start_date: params.start_date,
                end_date: params.end_date,
                skip: params.skip,
                limit: params.limit,
            },
        )
        .await?;

    Ok(Json(page))
}
