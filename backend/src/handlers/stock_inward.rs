//! HTTP handlers for stock inwards

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{LineItem, NewStockInward, StockInward};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::stock_inward::InwardFromOrderInput;
use crate::services::{CancelInput, ListQuery, StockInwardService, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> StockInwardService {
    StockInwardService::new(WorkflowContext::new(state))
}

pub async fn create_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewStockInward>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "create")?;
    let inward = service(&state).create(input, Some(current_user.0.user_id)).await?;
    Ok(Json(inward))
}

pub async fn create_inward_from_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<InwardFromOrderInput>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "create")?;
    let inward = service(&state)
        .create_from_purchase_order(input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(inward))
}

pub async fn list_stock_inwards(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StockInward>>> {
    check_permission(&current_user.0, "stock_inward", "read")?;
    query.validate()?;
    let inwards = service(&state).list(&query.filter()).await?;
    Ok(Json(inwards))
}

pub async fn get_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inward_id): Path<Uuid>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "read")?;
    let inward = service(&state).get(inward_id).await?;
    Ok(Json(inward))
}

pub async fn update_stock_inward_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inward_id): Path<Uuid>,
    Json(items): Json<Vec<LineItem>>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "update")?;
    let inward = service(&state).update_items(inward_id, items).await?;
    Ok(Json(inward))
}

pub async fn submit_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inward_id): Path<Uuid>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "update")?;
    let inward = service(&state).submit_for_verification(inward_id).await?;
    Ok(Json(inward))
}

/// Verify the inward and add its items to stock
pub async fn verify_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inward_id): Path<Uuid>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "verify")?;
    let inward = service(&state).verify(inward_id, Some(current_user.0.user_id)).await?;
    Ok(Json(inward))
}

pub async fn cancel_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inward_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<StockInward>> {
    check_permission(&current_user.0, "stock_inward", "cancel")?;
    let inward = service(&state).cancel(inward_id, input.reason).await?;
    Ok(Json(inward))
}

pub async fn delete_stock_inward(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inward_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&current_user.0, "stock_inward", "delete")?;
    service(&state).delete(inward_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
