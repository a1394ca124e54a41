//! HTTP handlers for purchase returns

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{NewPurchaseReturn, PurchaseReturn, RefundInput, ReturnItem, ShipmentDetails, ShipmentPatch};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::purchase_return::{DeliveredInput, ReturnFromSourceInput};
use crate::services::{CancelInput, ListQuery, PurchaseReturnService, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> PurchaseReturnService {
    PurchaseReturnService::new(WorkflowContext::new(state))
}

pub async fn create_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewPurchaseReturn>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "create")?;
    let doc = service(&state).create(input, Some(current_user.0.user_id)).await?;
    Ok(Json(doc))
}

pub async fn create_return_from_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ReturnFromSourceInput>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "create")?;
    let doc = service(&state)
        .create_from_purchase_order(input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(doc))
}

pub async fn create_return_from_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ReturnFromSourceInput>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "create")?;
    let doc = service(&state)
        .create_from_stock_inward(input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(doc))
}

pub async fn list_purchase_returns(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<PurchaseReturn>>> {
    check_permission(&current_user.0, "purchase_return", "read")?;
    query.validate()?;
    let docs = service(&state).list(&query.filter()).await?;
    Ok(Json(docs))
}

pub async fn get_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "read")?;
    let doc = service(&state).get(return_id).await?;
    Ok(Json(doc))
}

pub async fn update_purchase_return_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
    Json(items): Json<Vec<ReturnItem>>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "update")?;
    let doc = service(&state).update_items(return_id, items).await?;
    Ok(Json(doc))
}

pub async fn submit_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "update")?;
    let doc = service(&state).submit_for_approval(return_id).await?;
    Ok(Json(doc))
}

/// Approve the return and take its parts out of stock
pub async fn approve_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "approve")?;
    let doc = service(&state).approve(return_id, Some(current_user.0.user_id)).await?;
    Ok(Json(doc))
}

pub async fn ship_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
    Json(shipment): Json<ShipmentDetails>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "update")?;
    let doc = service(&state).mark_shipped(return_id, shipment).await?;
    Ok(Json(doc))
}

pub async fn update_purchase_return_shipment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
    Json(patch): Json<ShipmentPatch>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "update")?;
    let doc = service(&state).update_shipment(return_id, patch).await?;
    Ok(Json(doc))
}

pub async fn deliver_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
    Json(input): Json<DeliveredInput>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "update")?;
    let doc = service(&state).mark_delivered(return_id, input).await?;
    Ok(Json(doc))
}

pub async fn record_purchase_return_refund(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
    Json(refund): Json<RefundInput>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "refund")?;
    let doc = service(&state).record_refund(return_id, refund).await?;
    Ok(Json(doc))
}

pub async fn waive_purchase_return_refund(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "refund")?;
    let doc = service(&state).waive_refund(return_id).await?;
    Ok(Json(doc))
}

pub async fn close_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "update")?;
    let doc = service(&state).close(return_id).await?;
    Ok(Json(doc))
}

pub async fn cancel_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<PurchaseReturn>> {
    check_permission(&current_user.0, "purchase_return", "cancel")?;
    let doc = service(&state).cancel(return_id, input.reason).await?;
    Ok(Json(doc))
}

pub async fn delete_purchase_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(return_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&current_user.0, "purchase_return", "delete")?;
    service(&state).delete(return_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
