//! HTTP handlers for counter sales

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{CounterSale, CounterSaleChanges, LineItem, NewCounterSale, Payment, QuickSale};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::counter_sale::RefundSaleInput;
use crate::services::{CancelInput, CounterSaleService, ListQuery, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> CounterSaleService {
    CounterSaleService::new(WorkflowContext::new(state))
}

#[derive(Debug, Serialize)]
pub struct RemovedItemResponse {
    pub sale: CounterSale,
    pub removed: LineItem,
}

pub async fn create_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewCounterSale>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "create")?;
    let sale = service(&state).create(input, Some(current_user.0.user_id)).await?;
    Ok(Json(sale))
}

/// Create and complete a sale in one request
pub async fn quick_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<QuickSale>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "complete")?;
    let sale = service(&state).quick_sale(input, Some(current_user.0.user_id)).await?;
    Ok(Json(sale))
}

pub async fn list_counter_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<CounterSale>>> {
    check_permission(&current_user.0, "counter_sale", "read")?;
    query.validate()?;
    let sales = service(&state).list(&query.filter()).await?;
    Ok(Json(sales))
}

pub async fn get_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "read")?;
    let sale = service(&state).get(sale_id).await?;
    Ok(Json(sale))
}

pub async fn update_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(changes): Json<CounterSaleChanges>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "update")?;
    let sale = service(&state).update(sale_id, changes).await?;
    Ok(Json(sale))
}

pub async fn add_counter_sale_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(items): Json<Vec<LineItem>>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "update")?;
    let sale = service(&state).add_items(sale_id, items).await?;
    Ok(Json(sale))
}

pub async fn remove_counter_sale_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((sale_id, index)): Path<(Uuid, usize)>,
) -> AppResult<Json<RemovedItemResponse>> {
    check_permission(&current_user.0, "counter_sale", "update")?;
    let (sale, removed) = service(&state).remove_item(sale_id, index).await?;
    Ok(Json(RemovedItemResponse { sale, removed }))
}

pub async fn complete_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "complete")?;
    let sale = service(&state).complete_sale(sale_id).await?;
    Ok(Json(sale))
}

pub async fn add_counter_sale_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(payment): Json<Payment>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "pay")?;
    let sale = service(&state).add_payment(sale_id, payment).await?;
    Ok(Json(sale))
}

pub async fn cancel_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "cancel")?;
    let sale = service(&state).cancel(sale_id, input.reason).await?;
    Ok(Json(sale))
}

pub async fn refund_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<RefundSaleInput>,
) -> AppResult<Json<CounterSale>> {
    check_permission(&current_user.0, "counter_sale", "refund")?;
    let sale = service(&state).refund(sale_id, input).await?;
    Ok(Json(sale))
}

pub async fn delete_counter_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&current_user.0, "counter_sale", "delete")?;
    service(&state).delete(sale_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
