//! Purchase return service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    Action, NewPurchaseReturn, PurchaseOrder, PurchaseReturn, RefundInput, ReturnAllowance, ReturnItem,
    ReturnLine, ShipmentDetails, ShipmentPatch, StockInward,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::store::{self, DocumentFilter};
use crate::services::workflow::WorkflowContext;

/// Return drafted from a linked order or inward
#[derive(Debug, Deserialize)]
pub struct ReturnFromSourceInput {
    pub source_id: Uuid,
    pub lines: Vec<ReturnLine>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveredInput {
    pub delivered_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PurchaseReturnService {
    ctx: WorkflowContext,
}

impl PurchaseReturnService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewPurchaseReturn, created_by: Option<Uuid>) -> AppResult<PurchaseReturn> {
        self.ctx.create(|return_no| PurchaseReturn::new(return_no, input, created_by)).await
    }

    pub async fn create_from_purchase_order(
        &self,
        input: ReturnFromSourceInput,
        created_by: Option<Uuid>,
    ) -> AppResult<PurchaseReturn> {
        let order: PurchaseOrder = store::fetch(&self.ctx.db, input.source_id).await?;
        let others: Vec<PurchaseReturn> = store::list_linked(&self.ctx.db, "purchase_order_id", order.id).await?;
        self.ctx
            .create(|return_no| {
                PurchaseReturn::from_purchase_order(return_no, &order, &others, &input.lines, created_by)
            })
            .await
    }

    pub async fn create_from_stock_inward(
        &self,
        input: ReturnFromSourceInput,
        created_by: Option<Uuid>,
    ) -> AppResult<PurchaseReturn> {
        let inward: StockInward = store::fetch(&self.ctx.db, input.source_id).await?;
        let others: Vec<PurchaseReturn> = store::list_linked(&self.ctx.db, "stock_inward_id", inward.id).await?;
        self.ctx
            .create(|return_no| {
                PurchaseReturn::from_stock_inward(return_no, &inward, &others, &input.lines, created_by)
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PurchaseReturn> {
        store::fetch(&self.ctx.db, id).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<PurchaseReturn>> {
        store::list(&self.ctx.db, filter).await
    }

    /// Allowance of the order or inward a return was drafted from
    async fn allowance_for(&self, doc: &PurchaseReturn) -> AppResult<Option<ReturnAllowance>> {
        if let Some(inward_id) = doc.stock_inward_id {
            let inward: StockInward = store::fetch(&self.ctx.db, inward_id).await?;
            let others: Vec<PurchaseReturn> = store::list_linked(&self.ctx.db, "stock_inward_id", inward_id).await?;
            return Ok(Some(ReturnAllowance::for_stock_inward(&inward, &others, Some(doc.id))));
        }
        if let Some(order_id) = doc.purchase_order_id {
            let order: PurchaseOrder = store::fetch(&self.ctx.db, order_id).await?;
            let others: Vec<PurchaseReturn> = store::list_linked(&self.ctx.db, "purchase_order_id", order_id).await?;
            return Ok(Some(ReturnAllowance::for_purchase_order(&order, &others, Some(doc.id))));
        }
        Ok(None)
    }

    pub async fn update_items(&self, id: Uuid, items: Vec<ReturnItem>) -> AppResult<PurchaseReturn> {
        let current = self.get(id).await?;
        let allowance = self.allowance_for(&current).await?;
        let (doc, _) = self
            .ctx
            .update(id, Action::Update, |doc: &mut PurchaseReturn| {
                doc.update_items(items, allowance.as_ref())
            })
            .await?;
        Ok(doc)
    }

    pub async fn submit_for_approval(&self, id: Uuid) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::Submit, |doc: &mut PurchaseReturn| doc.submit_for_approval())
            .await?;
        Ok(doc)
    }

    /// Approve and take the returned parts out of stock
    pub async fn approve(&self, id: Uuid, approved_by: Option<Uuid>) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .transition(id, Action::Approve, move |doc: &mut PurchaseReturn, ledger| {
                doc.approve(ledger, approved_by)
            })
            .await?;
        Ok(doc)
    }

    pub async fn mark_shipped(&self, id: Uuid, shipment: ShipmentDetails) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::Ship, |doc: &mut PurchaseReturn| doc.mark_shipped(shipment))
            .await?;
        Ok(doc)
    }

    /// Patch tracking details on a shipped return
    pub async fn update_shipment(&self, id: Uuid, patch: ShipmentPatch) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::UpdateShipment, |doc: &mut PurchaseReturn| doc.update_shipment(patch))
            .await?;
        Ok(doc)
    }

    pub async fn mark_delivered(&self, id: Uuid, input: DeliveredInput) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::Deliver, |doc: &mut PurchaseReturn| {
                doc.mark_delivered(input.delivered_date)
            })
            .await?;
        Ok(doc)
    }

    pub async fn record_refund(&self, id: Uuid, refund: RefundInput) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::Refund, |doc: &mut PurchaseReturn| doc.record_refund(refund))
            .await?;
        Ok(doc)
    }

    pub async fn waive_refund(&self, id: Uuid) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::WaiveRefund, |doc: &mut PurchaseReturn| doc.waive_refund())
            .await?;
        Ok(doc)
    }

    pub async fn close(&self, id: Uuid) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .update(id, Action::Close, |doc: &mut PurchaseReturn| doc.close())
            .await?;
        Ok(doc)
    }

    /// Cancel; stock taken on approval goes back
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<PurchaseReturn> {
        let (doc, _) = self
            .ctx
            .transition(id, Action::Cancel, move |doc: &mut PurchaseReturn, ledger| doc.cancel(reason, ledger))
            .await?;
        Ok(doc)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.ctx.delete(id, |doc: &PurchaseReturn| doc.ensure_deletable()).await
    }
}
