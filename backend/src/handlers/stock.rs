//! HTTP handlers for the stock master

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use shared::{BulkOutcome, NewStockItem, StockItem, StockItemChanges, StockItemView};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::MovementRecord;
use crate::services::stock::{AdjustQuantityInput, StockFilter};
use crate::services::{StockService, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> StockService {
    StockService::new(WorkflowContext::new(state))
}

/// Query parameters for a part number lookup
#[derive(Debug, Deserialize)]
pub struct PartLookupQuery {
    pub workshop: Option<String>,
}

/// Query parameters for the movement history
#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<i64>,
}

pub async fn create_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewStockItem>,
) -> AppResult<Json<StockItem>> {
    check_permission(&current_user.0, "stock", "create")?;
    let item = service(&state).create(input).await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
pub struct BulkStockInput {
    pub items: Vec<NewStockItem>,
}

pub async fn bulk_create_stock_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkStockInput>,
) -> AppResult<Json<BulkOutcome<StockItem>>> {
    check_permission(&current_user.0, "stock", "create")?;
    let outcome = service(&state).bulk_create(input.items).await?;
    Ok(Json(outcome))
}

/// List stock rows with derived valuation and ageing
pub async fn list_stock_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<Vec<StockItemView>>> {
    check_permission(&current_user.0, "stock", "read")?;
    filter.validate()?;
    let now = Utc::now();
    let items = service(&state).list(&filter).await?;
    Ok(Json(items.into_iter().map(|item| StockItemView::new(item, now)).collect()))
}

pub async fn get_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<StockItemView>> {
    check_permission(&current_user.0, "stock", "read")?;
    let item = service(&state).get(stock_id).await?;
    Ok(Json(StockItemView::new(item, Utc::now())))
}

pub async fn get_stock_by_part_number(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(part_number): Path<String>,
    Query(query): Query<PartLookupQuery>,
) -> AppResult<Json<StockItem>> {
    check_permission(&current_user.0, "stock", "read")?;
    let item = service(&state)
        .get_by_part_number(query.workshop.as_deref(), &part_number)
        .await?;
    Ok(Json(item))
}

pub async fn update_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Json(changes): Json<StockItemChanges>,
) -> AppResult<Json<StockItem>> {
    check_permission(&current_user.0, "stock", "update")?;
    let item = service(&state).update(stock_id, changes).await?;
    Ok(Json(item))
}

pub async fn adjust_stock_quantity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<AdjustQuantityInput>,
) -> AppResult<Json<StockItem>> {
    check_permission(&current_user.0, "stock", "adjust")?;
    let item = service(&state).adjust_quantity(stock_id, input).await?;
    Ok(Json(item))
}

pub async fn deactivate_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<StockItem>> {
    check_permission(&current_user.0, "stock", "delete")?;
    let item = service(&state).deactivate(stock_id).await?;
    Ok(Json(item))
}

pub async fn list_stock_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Query(query): Query<MovementsQuery>,
) -> AppResult<Json<Vec<MovementRecord>>> {
    check_permission(&current_user.0, "stock", "read")?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let movements = service(&state).movements(stock_id, limit).await?;
    Ok(Json(movements))
}
