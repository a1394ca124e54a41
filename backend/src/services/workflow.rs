//! Transactional runner for document transitions
//!
//! Every state change follows the same shape: lock the document, lock a
//! snapshot of the stock rows it references, run the pure transition from
//! `shared` against the snapshot, write the journal and the document back,
//! commit. A failure anywhere rolls the whole transition back.

use chrono::Utc;
use shared::{Action, InMemoryLedger, QuantityFlow, StatusMachine, StockMovement, StockRef, WorkflowResult};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::store::{self, StoredDocument};
use crate::services::{ledger, sequence, StockAlertService};
use crate::AppState;

/// Everything a transition needs from the application state
#[derive(Clone)]
pub struct WorkflowContext {
    pub db: PgPool,
    pub home_workshop: String,
    pub low_stock_alerts: bool,
}

impl WorkflowContext {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            home_workshop: state.config.inventory.home_workshop.clone(),
            low_stock_alerts: state.config.inventory.low_stock_alerts,
        }
    }

    /// Allocate a number and insert a new document built from it
    pub async fn create<D, F>(&self, build: F) -> AppResult<D>
    where
        D: StoredDocument,
        F: FnOnce(String) -> WorkflowResult<D> + Send,
    {
        let mut tx = self.db.begin().await?;
        let document_no = sequence::next_document_no(&mut *tx, D::KIND, Utc::now().date_naive()).await?;
        let doc = build(document_no)?;
        store::insert(&mut *tx, &doc).await?;
        tx.commit().await?;

        tracing::info!(kind = %D::KIND, document_no = doc.document_no(), status = %doc.status(), "document created");
        Ok(doc)
    }

    /// Create a document whose construction already moves stock, against
    /// a locked snapshot of `refs`
    pub async fn create_with_stock<D, F>(&self, refs: Vec<StockRef>, build: F) -> AppResult<D>
    where
        D: StoredDocument,
        F: FnOnce(String, &mut InMemoryLedger) -> WorkflowResult<D> + Send,
    {
        let mut tx = self.db.begin().await?;
        let document_no = sequence::next_document_no(&mut *tx, D::KIND, Utc::now().date_naive()).await?;
        let mut snapshot = ledger::lock_snapshot(&mut tx, &self.home_workshop, &refs).await?;
        let doc = build(document_no, &mut snapshot)?;
        let journal = snapshot.take_journal();
        ledger::commit_journal(&mut tx, &journal, None).await?;
        store::insert(&mut *tx, &doc).await?;
        tx.commit().await?;

        tracing::info!(kind = %D::KIND, document_no = doc.document_no(), status = %doc.status(), "document created");
        self.after_commit(&journal).await;
        Ok(doc)
    }

    /// Run a transition that may move stock
    pub async fn transition<D, R, F>(&self, id: Uuid, action: Action, apply: F) -> AppResult<(D, R)>
    where
        D: StoredDocument + QuantityFlow,
        R: Send,
        F: FnOnce(&mut D, &mut InMemoryLedger) -> WorkflowResult<R> + Send,
    {
        self.transition_with_refs(id, action, Vec::new(), apply).await
    }

    /// Like [`Self::transition`], with `extra` rows added to the snapshot
    /// for lines the document does not reference yet
    pub async fn transition_with_refs<D, R, F>(
        &self,
        id: Uuid,
        action: Action,
        extra: Vec<StockRef>,
        apply: F,
    ) -> AppResult<(D, R)>
    where
        D: StoredDocument + QuantityFlow,
        R: Send,
        F: FnOnce(&mut D, &mut InMemoryLedger) -> WorkflowResult<R> + Send,
    {
        let mut tx = self.db.begin().await?;
        let mut doc: D = store::fetch_for_update(&mut *tx, id).await?;
        doc.ensure_can(action)?;

        let mut refs = doc.stock_refs(&self.home_workshop);
        refs.extend(extra);
        let mut snapshot = ledger::lock_snapshot(&mut tx, &self.home_workshop, &refs).await?;
        let result = apply(&mut doc, &mut snapshot)?;

        let journal = snapshot.take_journal();
        self.finish(tx, &doc, action, &journal).await?;
        Ok((doc, result))
    }

    /// Run a transition that never touches stock
    pub async fn update<D, R, F>(&self, id: Uuid, action: Action, apply: F) -> AppResult<(D, R)>
    where
        D: StoredDocument,
        R: Send,
        F: FnOnce(&mut D) -> WorkflowResult<R> + Send,
    {
        let mut tx = self.db.begin().await?;
        let mut doc: D = store::fetch_for_update(&mut *tx, id).await?;
        doc.ensure_can(action)?;
        let result = apply(&mut doc)?;
        self.finish(tx, &doc, action, &[]).await?;
        Ok((doc, result))
    }

    /// Delete a document the transition table still allows deleting
    pub async fn delete<D, F>(&self, id: Uuid, check: F) -> AppResult<()>
    where
        D: StoredDocument,
        F: FnOnce(&D) -> WorkflowResult<()> + Send,
    {
        let mut tx = self.db.begin().await?;
        let doc: D = store::fetch_for_update(&mut *tx, id).await?;
        check(&doc)?;
        store::delete(&mut *tx, &doc).await?;
        tx.commit().await?;

        tracing::info!(kind = %D::KIND, document_no = doc.document_no(), "document deleted");
        Ok(())
    }

    /// Write the journal and the document, commit, then log
    pub async fn finish<D: StoredDocument>(
        &self,
        mut tx: Transaction<'static, Postgres>,
        doc: &D,
        action: Action,
        journal: &[StockMovement],
    ) -> AppResult<()> {
        ledger::commit_journal(&mut tx, journal, None).await?;
        store::save(&mut *tx, doc).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %D::KIND,
            document_no = doc.document_no(),
            status = %doc.status(),
            movements = journal.len(),
            "{} applied",
            action
        );
        self.after_commit(journal).await;
        Ok(())
    }

    /// Raise low-stock alerts for rows that just lost stock. Failures are
    /// logged; the transition has already committed.
    pub async fn after_commit(&self, journal: &[StockMovement]) {
        if !self.low_stock_alerts {
            return;
        }
        let mut stock_ids: Vec<Uuid> = journal.iter().filter(|m| m.delta < 0).map(|m| m.stock_id).collect();
        if stock_ids.is_empty() {
            return;
        }
        stock_ids.sort();
        stock_ids.dedup();

        let alerts = StockAlertService::new(self.db.clone());
        if let Err(err) = alerts.raise_for_stock(&stock_ids).await {
            tracing::warn!("low-stock alert check failed: {}", err);
        }
    }
}
