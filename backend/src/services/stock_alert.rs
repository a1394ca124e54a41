//! Low-stock alert service

use std::collections::HashSet;

use chrono::Utc;
use shared::{
    resolve_alerts, Action, BulkOutcome, DocumentKind, StatusMachine, StockAlert, StockItem, WorkflowError,
    WorkflowResult,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{StockRow, STOCK_COLUMNS};
use crate::services::sequence;
use crate::services::store::{self, DocumentFilter};

#[derive(Clone)]
pub struct StockAlertService {
    db: PgPool,
}

impl StockAlertService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active low rows with no open alert, optionally limited to `ids`
    async fn unalerted_low_stock(&self, ids: Option<&[Uuid]>) -> AppResult<Vec<StockItem>> {
        let sql = format!(
            r#"
            SELECT {} FROM stock_items s
            WHERE s.is_active
              AND s.min_stock_level > 0
              AND s.quantity_on_hand <= s.min_stock_level
              AND ($1::uuid[] IS NULL OR s.id = ANY($1))
              AND NOT EXISTS (
                  SELECT 1 FROM stock_alerts a
                  WHERE (a.body ->> 'stock_id')::uuid = s.id
                    AND a.status IN ('active', 'acknowledged')
              )
            ORDER BY s.workshop, s.part_number
            "#,
            STOCK_COLUMNS
        );
        let rows = sqlx::query_as::<_, StockRow>(&sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(StockItem::from).collect())
    }

    async fn raise_all(&self, items: Vec<StockItem>) -> AppResult<Vec<StockAlert>> {
        let mut raised = Vec::new();
        for item in items {
            let mut tx = self.db.begin().await?;
            let alert_no = sequence::next_document_no(&mut *tx, DocumentKind::StockAlert, Utc::now().date_naive()).await?;
            let Some(alert) = StockAlert::raise(alert_no, &item) else {
                continue;
            };
            match store::insert(&mut *tx, &alert).await {
                Ok(()) => {}
                // another request raised one first
                Err(AppError::Workflow(WorkflowError::DuplicateKey { .. })) => continue,
                Err(err) => return Err(err),
            }
            tx.commit().await?;

            tracing::info!(
                alert_no = %alert.alert_no,
                part_number = %alert.part_number,
                workshop = %alert.workshop,
                priority = ?alert.priority,
                "low-stock alert raised"
            );
            raised.push(alert);
        }
        Ok(raised)
    }

    /// Raise alerts for the given rows if they have dropped to their minimum
    pub async fn raise_for_stock(&self, stock_ids: &[Uuid]) -> AppResult<Vec<StockAlert>> {
        let items = self.unalerted_low_stock(Some(stock_ids)).await?;
        self.raise_all(items).await
    }

    /// Scan the whole stock master and raise every missing alert
    pub async fn generate_low_stock_alerts(&self) -> AppResult<Vec<StockAlert>> {
        let items = self.unalerted_low_stock(None).await?;
        self.raise_all(items).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<StockAlert>> {
        store::list(&self.db, filter).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockAlert> {
        store::fetch(&self.db, id).await
    }

    async fn apply<F>(&self, id: Uuid, action: Action, apply: F) -> AppResult<StockAlert>
    where
        F: FnOnce(&mut StockAlert) -> WorkflowResult<()> + Send,
    {
        let mut tx = self.db.begin().await?;
        let mut alert: StockAlert = store::fetch_for_update(&mut *tx, id).await?;
        apply(&mut alert)?;
        store::save(&mut *tx, &alert).await?;
        tx.commit().await?;

        tracing::info!(alert_no = %alert.alert_no, status = %alert.status(), "{} applied", action);
        Ok(alert)
    }

    pub async fn acknowledge(&self, id: Uuid, by: Option<Uuid>) -> AppResult<StockAlert> {
        self.apply(id, Action::Acknowledge, |alert| alert.acknowledge(by)).await
    }

    pub async fn resolve(&self, id: Uuid, note: Option<String>) -> AppResult<StockAlert> {
        self.apply(id, Action::Resolve, |alert| alert.resolve(note)).await
    }

    /// Resolve several alerts in one transaction; missing or closed ones are reported back
    pub async fn bulk_resolve(&self, ids: &[Uuid], note: Option<String>) -> AppResult<BulkOutcome<StockAlert>> {
        if ids.is_empty() {
            return Err(WorkflowError::validation("alert_ids", "at least one alert is required").into());
        }
        let mut tx = self.db.begin().await?;
        let mut missing = BulkOutcome::<StockAlert>::default();
        let mut alerts = Vec::with_capacity(ids.len());
        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let fetched: AppResult<StockAlert> = store::fetch_for_update(&mut *tx, id).await;
            match fetched {
                Ok(alert) => alerts.push(alert),
                Err(AppError::Workflow(err @ WorkflowError::NotFound { .. })) => missing.fail(id.to_string(), err),
                Err(err) => return Err(err),
            }
        }

        let mut outcome = resolve_alerts(alerts, note.as_deref());
        for alert in &outcome.succeeded {
            store::save(&mut *tx, alert).await?;
        }
        tx.commit().await?;

        outcome.failed.extend(missing.failed);
        tracing::info!(
            resolved = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "alerts bulk resolved"
        );
        Ok(outcome)
    }

    pub async fn ignore(&self, id: Uuid, note: Option<String>) -> AppResult<StockAlert> {
        self.apply(id, Action::Ignore, |alert| alert.ignore(note)).await
    }
}
