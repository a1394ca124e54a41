//! Stock master service
//!
//! Descriptive fields are edited directly; quantities only change through
//! the ledger, either from a document transition or a manual adjustment.

use chrono::Utc;
use serde::Deserialize;
use shared::{
    Action, BulkOutcome, DocumentKind, MovementReason, NewStockItem, StockItem, StockItemChanges, StockLedger,
    StockRef, WorkflowError,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{MovementRecord, StockRow, STOCK_COLUMNS};
use crate::services::workflow::WorkflowContext;
use crate::services::{ledger, sequence};

/// Stock master listing filter
#[derive(Debug, Default, Deserialize, Validate)]
pub struct StockFilter {
    pub workshop: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
    #[serde(default)]
    pub include_inactive: bool,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

/// Manual correction of a row's quantity
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustQuantityInput {
    /// Signed change; negative removes stock
    pub delta: i32,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Stock master service
#[derive(Clone)]
pub struct StockService {
    ctx: WorkflowContext,
}

impl StockService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    fn db(&self) -> &PgPool {
        &self.ctx.db
    }

    pub async fn create(&self, input: NewStockItem) -> AppResult<StockItem> {
        let item = StockItem::new(input, &self.ctx.home_workshop)?;
        let mut conn = self.db().acquire().await?;
        ledger::insert_stock_item(&mut conn, &item).await?;

        tracing::info!(
            workshop = %item.workshop,
            part_number = %item.part_number,
            quantity_on_hand = item.quantity_on_hand,
            "stock item created"
        );
        Ok(item)
    }

    /// Register many parts at once; each row stands or fails on its own
    pub async fn bulk_create(&self, inputs: Vec<NewStockItem>) -> AppResult<BulkOutcome<StockItem>> {
        if inputs.is_empty() {
            return Err(WorkflowError::validation("items", "at least one item is required").into());
        }
        let batch = StockItem::new_batch(inputs, &self.ctx.home_workshop);
        let mut outcome = BulkOutcome {
            succeeded: Vec::with_capacity(batch.succeeded.len()),
            failed: batch.failed,
        };

        let mut conn = self.db().acquire().await?;
        for item in batch.succeeded {
            match ledger::insert_stock_item(&mut conn, &item).await {
                Ok(()) => outcome.succeeded.push(item),
                Err(AppError::Workflow(err @ WorkflowError::DuplicateKey { .. })) => {
                    outcome.fail(item.part_number.clone(), err);
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            created = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "stock items bulk created"
        );
        Ok(outcome)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockItem> {
        let sql = format!("SELECT {} FROM stock_items WHERE id = $1", STOCK_COLUMNS);
        sqlx::query_as::<_, StockRow>(&sql)
            .bind(id)
            .fetch_optional(self.db())
            .await?
            .map(StockItem::from)
            .ok_or_else(|| WorkflowError::not_found("stock item", id.to_string()).into())
    }

    /// Look a part up in a workshop, the home workshop by default
    pub async fn get_by_part_number(&self, workshop: Option<&str>, part_number: &str) -> AppResult<StockItem> {
        let workshop = workshop.unwrap_or(&self.ctx.home_workshop);
        let mut conn = self.db().acquire().await?;
        ledger::find_part(&mut conn, workshop, part_number)
            .await?
            .ok_or_else(|| WorkflowError::not_found("stock item", shared::workshop_key(workshop, part_number)).into())
    }

    pub async fn list(&self, filter: &StockFilter) -> AppResult<Vec<StockItem>> {
        let sql = format!(
            r#"
            SELECT {} FROM stock_items
            WHERE ($1 OR is_active)
              AND ($2::text IS NULL OR workshop = $2)
              AND ($3::text IS NULL OR category = $3)
              AND (NOT $4 OR (min_stock_level > 0 AND quantity_on_hand <= min_stock_level))
            ORDER BY workshop, part_number
            LIMIT $5 OFFSET $6
            "#,
            STOCK_COLUMNS
        );
        let rows = sqlx::query_as::<_, StockRow>(&sql)
            .bind(filter.include_inactive)
            .bind(&filter.workshop)
            .bind(&filter.category)
            .bind(filter.low_stock_only)
            .bind(filter.limit.unwrap_or(100))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(self.db())
            .await?;
        Ok(rows.into_iter().map(StockItem::from).collect())
    }

    /// Edit descriptive fields and prices; never the quantity
    pub async fn update(&self, id: Uuid, changes: StockItemChanges) -> AppResult<StockItem> {
        let mut tx = self.db().begin().await?;
        let sql = format!("SELECT {} FROM stock_items WHERE id = $1 FOR UPDATE", STOCK_COLUMNS);
        let mut item: StockItem = sqlx::query_as::<_, StockRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .map(StockItem::from)
            .ok_or_else(|| WorkflowError::not_found("stock item", id.to_string()))?;

        item.apply_changes(changes)?;

        sqlx::query(
            r#"
            UPDATE stock_items
            SET part_name = $2, brand = $3, category = $4, purchase_price = $5,
                selling_price = $6, tax_type = $7, tax_percent = $8, rack_no = $9,
                min_stock_level = $10, max_stock_level = $11, location = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.part_name)
        .bind(&item.brand)
        .bind(&item.category)
        .bind(item.purchase_price)
        .bind(item.selling_price)
        .bind(item.tax_type.as_str())
        .bind(item.tax_percent)
        .bind(&item.rack_no)
        .bind(item.min_stock_level)
        .bind(item.max_stock_level)
        .bind(&item.location)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(part_number = %item.part_number, workshop = %item.workshop, "stock item updated");
        Ok(item)
    }

    /// Manual stock adjustment, recorded as an `ADJ` movement
    pub async fn adjust_quantity(&self, id: Uuid, input: AdjustQuantityInput) -> AppResult<StockItem> {
        input.validate()?;
        if input.delta == 0 {
            return Err(WorkflowError::validation("delta", "adjustment must change the quantity").into());
        }

        let mut tx = self.db().begin().await?;
        let adjustment_no =
            sequence::next_document_no(&mut *tx, DocumentKind::StockAdjustment, Utc::now().date_naive()).await?;
        let refs = [StockRef {
            stock_id: Some(id),
            workshop: self.ctx.home_workshop.clone(),
            part_number: String::new(),
        }];
        let mut snapshot = ledger::lock_snapshot(&mut tx, &self.ctx.home_workshop, &refs).await?;
        let reason = MovementReason::new(DocumentKind::StockAdjustment, adjustment_no, Action::Adjust);
        let item = snapshot.adjust(id, input.delta, &reason)?.clone();

        let journal = snapshot.take_journal();
        ledger::commit_journal(&mut tx, &journal, Some(&input.reason)).await?;
        tx.commit().await?;

        tracing::info!(
            part_number = %item.part_number,
            delta = input.delta,
            quantity_on_hand = item.quantity_on_hand,
            reason = %input.reason,
            "stock adjusted"
        );
        self.ctx.after_commit(&journal).await;
        Ok(item)
    }

    /// Soft delete; the row stays for history and document references
    pub async fn deactivate(&self, id: Uuid) -> AppResult<StockItem> {
        let result = sqlx::query("UPDATE stock_items SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.db())
            .await?;
        if result.rows_affected() == 0 {
            return Err(WorkflowError::not_found("stock item", id.to_string()).into());
        }
        tracing::info!(stock_id = %id, "stock item deactivated");
        self.get(id).await
    }

    /// Ledger history of one row, newest first
    pub async fn movements(&self, id: Uuid, limit: i64) -> AppResult<Vec<MovementRecord>> {
        let rows = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT id, stock_id, workshop, part_number, delta, quantity_after,
                   document_kind, document_no, action, note, moved_at
            FROM stock_movements
            WHERE stock_id = $1
            ORDER BY moved_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(id)
        .bind(limit)
        .fetch_all(self.db())
        .await?;
        Ok(rows)
    }
}
