//! Stock inward service

use serde::Deserialize;
use shared::{Action, LineItem, NewStockInward, PurchaseOrder, QuantityFlow, StatusMachine, StockInward};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ledger;
use crate::services::store::{self, DocumentFilter};
use crate::services::workflow::WorkflowContext;

#[derive(Debug, Deserialize)]
pub struct InwardFromOrderInput {
    pub purchase_order_id: Uuid,
    pub receipt_no: Option<String>,
}

#[derive(Clone)]
pub struct StockInwardService {
    ctx: WorkflowContext,
}

impl StockInwardService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewStockInward, created_by: Option<Uuid>) -> AppResult<StockInward> {
        self.ctx.create(|inward_no| StockInward::new(inward_no, input, created_by)).await
    }

    /// Draft an inward for everything still outstanding on an order
    pub async fn create_from_purchase_order(
        &self,
        input: InwardFromOrderInput,
        created_by: Option<Uuid>,
    ) -> AppResult<StockInward> {
        let order: PurchaseOrder = store::fetch(&self.ctx.db, input.purchase_order_id).await?;
        self.ctx
            .create(|inward_no| StockInward::from_purchase_order(inward_no, &order, input.receipt_no, created_by))
            .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockInward> {
        store::fetch(&self.ctx.db, id).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<StockInward>> {
        store::list(&self.ctx.db, filter).await
    }

    pub async fn update_items(&self, id: Uuid, items: Vec<LineItem>) -> AppResult<StockInward> {
        let (inward, _) = self
            .ctx
            .update(id, Action::Update, |inward: &mut StockInward| inward.update_items(items))
            .await?;
        Ok(inward)
    }

    pub async fn submit_for_verification(&self, id: Uuid) -> AppResult<StockInward> {
        let (inward, _) = self
            .ctx
            .update(id, Action::Submit, |inward: &mut StockInward| inward.submit_for_verification())
            .await?;
        Ok(inward)
    }

    /// Verify and add to stock. When the inward came from an order, the
    /// order is locked and updated in the same transaction.
    pub async fn verify(&self, id: Uuid, verified_by: Option<Uuid>) -> AppResult<StockInward> {
        let mut tx = self.ctx.db.begin().await?;
        let mut inward: StockInward = store::fetch_for_update(&mut *tx, id).await?;
        inward.ensure_can(Action::Verify)?;

        let mut order: Option<PurchaseOrder> = match inward.purchase_order_id {
            Some(order_id) => Some(store::fetch_for_update(&mut *tx, order_id).await?),
            None => None,
        };

        let refs = inward.stock_refs(&self.ctx.home_workshop);
        let mut snapshot = ledger::lock_snapshot(&mut tx, &self.ctx.home_workshop, &refs).await?;
        inward.verify_and_update_stock(&mut snapshot, order.as_mut(), verified_by)?;

        if let Some(order) = &order {
            store::save(&mut *tx, order).await?;
            tracing::info!(order_no = %order.order_no, status = %order.status, "purchase order receipt recorded");
        }
        let journal = snapshot.take_journal();
        self.ctx.finish(tx, &inward, Action::Verify, &journal).await?;
        Ok(inward)
    }

    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<StockInward> {
        let (inward, _) = self
            .ctx
            .update(id, Action::Cancel, |inward: &mut StockInward| inward.cancel(reason))
            .await?;
        Ok(inward)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.ctx.delete(id, |inward: &StockInward| inward.ensure_deletable()).await
    }
}
