//! Sale and payment method endpoints.

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
use tally_core::tender::TenderLine;
use tally_core::{PaymentMethod, Sale, SalePayment, DEFAULT_PAGE_LIMIT};
use tally_db::{
    SaleDetail, SalePage, SaleQuery, SaleReceipt, SimpleSaleRequest, SplitSaleRequest,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(create_sale))
        .route("/sales/multi-payment", post(create_split_sale))
        .route("/sales/{id}", get(get_sale).delete(delete_sale))
        .route("/sales/{id}/void", post(void_sale))
        .route("/sales/{id}/payments", get(sale_payments))
        .route("/payment-methods", get(list_payment_methods))
}

#[derive(Debug, Deserialize)]
pub struct SaleBody {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub payment_method_id: String,
    pub total_amount: Option<Money>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SplitSaleBody {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_amount: Money,
    #[serde(default)]
    pub payments: Vec<TenderLine>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoidBody {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SaleListParams {
    pub cashier_id: Option<String>,
    pub product_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

async fn list_sales(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<SaleListParams>,
) -> Result<Json<SalePage>, ApiError> {
    let page = state
        .sales
        .list_sales(
            &actor,
            SaleQuery {
                cashier_id: params.cashier_id,
                product_id: params.product_id,
                payment_method_id: params.payment_method_id,
                start_date: params.start_date,
                end_date: params.end_date,
                skip: params.skip,
                limit: params.limit,
            },
        )
        .await?;

    Ok(Json(page))
}

async fn get_sale(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SaleDetail>, ApiError> {
    Ok(Json(state.sales.get_sale(&actor, &id).await?))
}

async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<SaleBody>,
) -> Result<(StatusCode, Json<Sale>), ApiError> {
    let receipt = state
        .sales
        .create_simple_sale(
            &actor,
            SimpleSaleRequest {
                product_id: body.product_id,
                quantity: body.quantity,
                unit_price: body.unit_price,
                payment_method_id: body.payment_method_id,
                total_amount: body.total_amount,
                notes: body.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.sale)))
}

async fn create_split_sale(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<SplitSaleBody>,
) -> Result<(StatusCode, Json<SaleReceipt>), ApiError> {
    let receipt = state
        .sales
        .create_split_sale(
            &actor,
            SplitSaleRequest {
                product_id: body.product_id,
                quantity: body.quantity,
                unit_price: body.unit_price,
                total_amount: body.total_amount,
                payments: body.payments,
                customer_name: body.customer_name,
                notes: body.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn delete_sale(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sales.delete_sale(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn void_sale(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<VoidBody>,
) -> Result<Json<Sale>, ApiError> {
    Ok(Json(state.sales.void_sale(&actor, &id, &body.reason).await?))
}

async fn sale_payments(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<SalePayment>>, ApiError> {
    Ok(Json(state.sales.sale_payments(&id).await?))
}

async fn list_payment_methods(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    Ok(Json(state.sales.list_payment_methods().await?))
}
