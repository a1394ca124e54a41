//! HTTP handlers for inter-workshop transfers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{DispatchDetails, LineItem, NewStockTransfer, StockTransfer};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::stock_transfer::{DeliveredTransferInput, ReceiveTransferInput};
use crate::services::{CancelInput, ListQuery, StockTransferService, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> StockTransferService {
    StockTransferService::new(WorkflowContext::new(state))
}

pub async fn create_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewStockTransfer>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "create")?;
    let transfer = service(&state).create(input, Some(current_user.0.user_id)).await?;
    Ok(Json(transfer))
}

pub async fn list_stock_transfers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StockTransfer>>> {
    check_permission(&current_user.0, "stock_transfer", "read")?;
    query.validate()?;
    let transfers = service(&state).list(&query.filter()).await?;
    Ok(Json(transfers))
}

pub async fn get_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "read")?;
    let transfer = service(&state).get(transfer_id).await?;
    Ok(Json(transfer))
}

pub async fn update_stock_transfer_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(items): Json<Vec<LineItem>>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "update")?;
    let transfer = service(&state).update_items(transfer_id, items).await?;
    Ok(Json(transfer))
}

pub async fn submit_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "update")?;
    let transfer = service(&state).submit_for_approval(transfer_id).await?;
    Ok(Json(transfer))
}

pub async fn approve_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "approve")?;
    let transfer = service(&state).approve(transfer_id, Some(current_user.0.user_id)).await?;
    Ok(Json(transfer))
}

/// Dispatch from the source workshop
pub async fn dispatch_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(details): Json<DispatchDetails>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "dispatch")?;
    let transfer = service(&state)
        .dispatch(transfer_id, details, Some(current_user.0.user_id))
        .await?;
    Ok(Json(transfer))
}

pub async fn deliver_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<DeliveredTransferInput>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "update")?;
    let transfer = service(&state).mark_delivered(transfer_id, input).await?;
    Ok(Json(transfer))
}

/// Receive at the destination workshop
pub async fn receive_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ReceiveTransferInput>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "receive")?;
    let transfer = service(&state)
        .receive(transfer_id, input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(transfer))
}

pub async fn cancel_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<StockTransfer>> {
    check_permission(&current_user.0, "stock_transfer", "cancel")?;
    let transfer = service(&state).cancel(transfer_id, input.reason).await?;
    Ok(Json(transfer))
}

pub async fn delete_stock_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&current_user.0, "stock_transfer", "delete")?;
    service(&state).delete(transfer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
