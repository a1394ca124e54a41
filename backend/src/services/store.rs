//! Generic document repository
//!
//! Every document kind lives in its own table with the same layout: the
//! indexed scalars (`id`, `document_no`, `status`) plus the whole document
//! as JSONB. One set of queries serves them all.

use serde::{de::DeserializeOwned, Serialize};
use shared::{DocumentKind, StatusMachine, WorkflowError};
use sqlx::{types::Json, PgExecutor};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A document that can be persisted in a JSONB table
pub trait StoredDocument: StatusMachine + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {}

impl<T> StoredDocument for T where T: StatusMachine + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {}

/// Table a document kind is stored in
pub fn table_for(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::PurchaseOrder => "purchase_orders",
        DocumentKind::StockInward => "stock_inwards",
        DocumentKind::StockIssue => "stock_issues",
        DocumentKind::CounterSale => "counter_sales",
        DocumentKind::PurchaseReturn => "purchase_returns",
        DocumentKind::StockTransfer => "stock_transfers",
        // adjustments exist only as movement rows
        DocumentKind::StockAdjustment => "stock_movements",
        DocumentKind::StockAlert => "stock_alerts",
    }
}

/// Listing filter shared by every document kind
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub status: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Serialized form of a document plus the status column value
fn encode<D: StoredDocument>(doc: &D) -> AppResult<(serde_json::Value, String)> {
    let body = serde_json::to_value(doc).map_err(anyhow::Error::from)?;
    let status = body
        .get("status")
        .and_then(|s| s.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("{} {} serialized without a status", D::KIND, doc.document_no()))?;
    Ok((body, status))
}

pub async fn insert<'e, D: StoredDocument>(db: impl PgExecutor<'e>, doc: &D) -> AppResult<()> {
    let (body, status) = encode(doc)?;
    let sql = format!(
        "INSERT INTO {} (id, document_no, status, body) VALUES ($1, $2, $3, $4)",
        table_for(D::KIND)
    );
    sqlx::query(&sql)
        .bind(doc.id())
        .bind(doc.document_no())
        .bind(status)
        .bind(body)
        .execute(db)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Workflow(WorkflowError::DuplicateKey { .. }) => AppError::Workflow(WorkflowError::DuplicateKey {
                entity: D::KIND.as_str(),
                key: doc.document_no().to_string(),
            }),
            other => other,
        })?;
    Ok(())
}

/// Persist the document's current state
pub async fn save<'e, D: StoredDocument>(db: impl PgExecutor<'e>, doc: &D) -> AppResult<()> {
    let (body, status) = encode(doc)?;
    let sql = format!(
        "UPDATE {} SET status = $2, body = $3, updated_at = NOW() WHERE id = $1",
        table_for(D::KIND)
    );
    let result = sqlx::query(&sql)
        .bind(doc.id())
        .bind(status)
        .bind(body)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(WorkflowError::not_found(D::KIND.as_str(), doc.id().to_string()).into());
    }
    Ok(())
}

pub async fn fetch<'e, D: StoredDocument>(db: impl PgExecutor<'e>, id: Uuid) -> AppResult<D> {
    let sql = format!("SELECT body FROM {} WHERE id = $1", table_for(D::KIND));
    sqlx::query_scalar::<_, Json<D>>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(|body| body.0)
        .ok_or_else(|| WorkflowError::not_found(D::KIND.as_str(), id.to_string()).into())
}

/// Load and row-lock a document for the rest of the transaction
pub async fn fetch_for_update<'e, D: StoredDocument>(db: impl PgExecutor<'e>, id: Uuid) -> AppResult<D> {
    let sql = format!("SELECT body FROM {} WHERE id = $1 FOR UPDATE", table_for(D::KIND));
    sqlx::query_scalar::<_, Json<D>>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(|body| body.0)
        .ok_or_else(|| WorkflowError::not_found(D::KIND.as_str(), id.to_string()).into())
}

pub async fn fetch_by_no<'e, D: StoredDocument>(db: impl PgExecutor<'e>, document_no: &str) -> AppResult<D> {
    let sql = format!("SELECT body FROM {} WHERE document_no = $1", table_for(D::KIND));
    sqlx::query_scalar::<_, Json<D>>(&sql)
        .bind(document_no)
        .fetch_optional(db)
        .await?
        .map(|body| body.0)
        .ok_or_else(|| WorkflowError::not_found(D::KIND.as_str(), document_no.to_string()).into())
}

/// Newest first
pub async fn list<'e, D: StoredDocument>(db: impl PgExecutor<'e>, filter: &DocumentFilter) -> AppResult<Vec<D>> {
    let sql = format!(
        r#"
        SELECT body FROM {}
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
        table_for(D::KIND)
    );
    let rows = sqlx::query_scalar::<_, Json<D>>(&sql)
        .bind(filter.status.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|body| body.0).collect())
}

/// Documents whose body field `link` holds `id`, oldest first
pub async fn list_linked<'e, D: StoredDocument>(db: impl PgExecutor<'e>, link: &str, id: Uuid) -> AppResult<Vec<D>> {
    let sql = format!(
        "SELECT body FROM {} WHERE body ->> $1 = $2::text ORDER BY created_at",
        table_for(D::KIND)
    );
    let rows = sqlx::query_scalar::<_, Json<D>>(&sql)
        .bind(link)
        .bind(id.to_string())
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|body| body.0).collect())
}

pub async fn delete<'e, D: StoredDocument>(db: impl PgExecutor<'e>, doc: &D) -> AppResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = $1", table_for(D::KIND));
    sqlx::query(&sql).bind(doc.id()).execute(db).await?;
    Ok(())
}
