//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{LineItem, NewPurchaseOrder, Payment, PurchaseOrder};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::purchase_order::{InwardPartsInput, RejectPartsInput};
use crate::services::{CancelInput, ListQuery, PurchaseOrderService, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> PurchaseOrderService {
    PurchaseOrderService::new(WorkflowContext::new(state))
}

#[derive(Debug, Deserialize)]
pub struct RemovePartInput {
    pub part_number: String,
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewPurchaseOrder>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "create")?;
    let order = service(&state).create(input, Some(current_user.0.user_id)).await?;
    Ok(Json(order))
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    check_permission(&current_user.0, "purchase_order", "read")?;
    query.validate()?;
    let orders = service(&state).list(&query.filter()).await?;
    Ok(Json(orders))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "read")?;
    let order = service(&state).get(order_id).await?;
    Ok(Json(order))
}

pub async fn get_purchase_order_by_no(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_no): Path<String>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "read")?;
    let order = service(&state).get_by_no(&order_no).await?;
    Ok(Json(order))
}

pub async fn submit_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "update")?;
    let order = service(&state).submit(order_id).await?;
    Ok(Json(order))
}

pub async fn add_ordered_part(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(line): Json<LineItem>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "update")?;
    let order = service(&state).add_ordered_part(order_id, line).await?;
    Ok(Json(order))
}

pub async fn remove_ordered_part(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<RemovePartInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "update")?;
    let order = service(&state).remove_ordered_part(order_id, input.part_number).await?;
    Ok(Json(order))
}

pub async fn inward_purchase_order_parts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<InwardPartsInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "inward")?;
    let order = service(&state).inward_parts(order_id, input).await?;
    Ok(Json(order))
}

pub async fn reject_purchase_order_parts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<RejectPartsInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "inward")?;
    let order = service(&state).reject_parts(order_id, input).await?;
    Ok(Json(order))
}

pub async fn record_purchase_order_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(payment): Json<Payment>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "pay")?;
    let order = service(&state).record_payment(order_id, payment).await?;
    Ok(Json(order))
}

pub async fn close_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "update")?;
    let order = service(&state).close(order_id).await?;
    Ok(Json(order))
}

pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_order", "cancel")?;
    let order = service(&state).cancel(order_id, input.reason).await?;
    Ok(Json(order))
}

pub async fn delete_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&current_user.0, "purchase_order", "delete")?;
    service(&state).delete(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
