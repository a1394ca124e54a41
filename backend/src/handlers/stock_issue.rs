//! HTTP handlers for stock issues against job cards

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{IssueAllOutcome, StockIssue};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::stock_issue::{CreateStockIssueInput, IssuePartsInput, UpdateStockIssueInput};
use crate::services::{CancelInput, ListQuery, StockIssueService, WorkflowContext};
use crate::AppState;

fn service(state: &AppState) -> StockIssueService {
    StockIssueService::new(WorkflowContext::new(state))
}

/// Issue plus the per-item outcome of an issue-all request
#[derive(Debug, Serialize)]
pub struct IssueAllResponse {
    pub issue: StockIssue,
    pub outcome: IssueAllOutcome,
}

pub async fn create_stock_issue(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockIssueInput>,
) -> AppResult<Json<StockIssue>> {
    check_permission(&current_user.0, "stock_issue", "create")?;
    let issue = service(&state).create(input, Some(current_user.0.user_id)).await?;
    Ok(Json(issue))
}

pub async fn list_stock_issues(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StockIssue>>> {
    check_permission(&current_user.0, "stock_issue", "read")?;
    query.validate()?;
    let issues = service(&state).list(&query.filter()).await?;
    Ok(Json(issues))
}

pub async fn get_stock_issue(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
) -> AppResult<Json<StockIssue>> {
    check_permission(&current_user.0, "stock_issue", "read")?;
    let issue = service(&state).get(issue_id).await?;
    Ok(Json(issue))
}

pub async fn update_stock_issue(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
    Json(input): Json<UpdateStockIssueInput>,
) -> AppResult<Json<StockIssue>> {
    check_permission(&current_user.0, "stock_issue", "update")?;
    let issue = service(&state).update(issue_id, input).await?;
    Ok(Json(issue))
}

pub async fn issue_parts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
    Json(input): Json<IssuePartsInput>,
) -> AppResult<Json<StockIssue>> {
    check_permission(&current_user.0, "stock_issue", "issue")?;
    let issue = service(&state)
        .issue_parts(issue_id, input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(issue))
}

pub async fn issue_all_parts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
) -> AppResult<Json<IssueAllResponse>> {
    check_permission(&current_user.0, "stock_issue", "issue")?;
    let (issue, outcome) = service(&state)
        .issue_all_parts(issue_id, Some(current_user.0.user_id))
        .await?;
    Ok(Json(IssueAllResponse { issue, outcome }))
}

pub async fn return_issued_parts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
    Json(input): Json<IssuePartsInput>,
) -> AppResult<Json<StockIssue>> {
    check_permission(&current_user.0, "stock_issue", "return")?;
    let issue = service(&state).return_parts(issue_id, input).await?;
    Ok(Json(issue))
}

pub async fn cancel_stock_issue(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<StockIssue>> {
    check_permission(&current_user.0, "stock_issue", "cancel")?;
    let issue = service(&state).cancel(issue_id, input.reason).await?;
    Ok(Json(issue))
}

pub async fn delete_stock_issue(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issue_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&current_user.0, "stock_issue", "delete")?;
    service(&state).delete(issue_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
