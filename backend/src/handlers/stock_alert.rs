//! HTTP handlers for low-stock alerts

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{BulkOutcome, StockAlert};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::{ListQuery, StockAlertService};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AlertNoteInput {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkResolveInput {
    pub alert_ids: Vec<Uuid>,
    pub note: Option<String>,
}

pub async fn list_stock_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StockAlert>>> {
    check_permission(&current_user.0, "stock_alert", "read")?;
    query.validate()?;
    let alerts = StockAlertService::new(state.db).list(&query.filter()).await?;
    Ok(Json(alerts))
}

pub async fn get_stock_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<StockAlert>> {
    check_permission(&current_user.0, "stock_alert", "read")?;
    let alert = StockAlertService::new(state.db).get(alert_id).await?;
    Ok(Json(alert))
}

/// Scan all stock and raise alerts for low rows that have none open
pub async fn generate_stock_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockAlert>>> {
    check_permission(&current_user.0, "stock_alert", "create")?;
    let alerts = StockAlertService::new(state.db).generate_low_stock_alerts().await?;
    Ok(Json(alerts))
}

pub async fn acknowledge_stock_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<StockAlert>> {
    check_permission(&current_user.0, "stock_alert", "update")?;
    let alert = StockAlertService::new(state.db)
        .acknowledge(alert_id, Some(current_user.0.user_id))
        .await?;
    Ok(Json(alert))
}

pub async fn resolve_stock_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<AlertNoteInput>,
) -> AppResult<Json<StockAlert>> {
    check_permission(&current_user.0, "stock_alert", "update")?;
    let alert = StockAlertService::new(state.db).resolve(alert_id, input.note).await?;
    Ok(Json(alert))
}

pub async fn ignore_stock_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<AlertNoteInput>,
) -> AppResult<Json<StockAlert>> {
    check_permission(&current_user.0, "stock_alert", "update")?;
    let alert = StockAlertService::new(state.db).ignore(alert_id, input.note).await?;
    Ok(Json(alert))
}

pub async fn bulk_resolve_stock_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkResolveInput>,
) -> AppResult<Json<BulkOutcome<StockAlert>>> {
    check_permission(&current_user.0, "stock_alert", "update")?;
    let outcome = StockAlertService::new(state.db)
        .bulk_resolve(&input.alert_ids, input.note)
        .await?;
    Ok(Json(outcome))
}
