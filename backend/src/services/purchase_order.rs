//! Purchase order service

use serde::Deserialize;
use shared::{Action, LineItem, NewPurchaseOrder, PartQuantity, Payment, PurchaseOrder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::store::{self, DocumentFilter};
use crate::services::workflow::WorkflowContext;

/// Parts received against the order
#[derive(Debug, Deserialize)]
pub struct InwardPartsInput {
    pub parts: Vec<PartQuantity>,
    /// Add the parts to stock as well as recording them on the order
    #[serde(default = "default_true")]
    pub update_stock: bool,
}

fn default_true() -> bool {
    true
}

/// Parts refused on delivery
#[derive(Debug, Deserialize)]
pub struct RejectPartsInput {
    pub parts: Vec<PartQuantity>,
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    ctx: WorkflowContext,
}

impl PurchaseOrderService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewPurchaseOrder, created_by: Option<Uuid>) -> AppResult<PurchaseOrder> {
        self.ctx.create(|order_no| PurchaseOrder::new(order_no, input, created_by)).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        store::fetch(&self.ctx.db, id).await
    }

    pub async fn get_by_no(&self, order_no: &str) -> AppResult<PurchaseOrder> {
        store::fetch_by_no(&self.ctx.db, order_no).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<PurchaseOrder>> {
        store::list(&self.ctx.db, filter).await
    }

    pub async fn submit(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        let (order, _) = self.ctx.update(id, Action::Submit, |po: &mut PurchaseOrder| po.submit()).await?;
        Ok(order)
    }

    pub async fn add_ordered_part(&self, id: Uuid, line: LineItem) -> AppResult<PurchaseOrder> {
        let (order, _) = self
            .ctx
            .update(id, Action::Update, |po: &mut PurchaseOrder| po.add_ordered_part(line))
            .await?;
        Ok(order)
    }

    pub async fn remove_ordered_part(&self, id: Uuid, part_number: String) -> AppResult<PurchaseOrder> {
        let (order, _) = self
            .ctx
            .update(id, Action::Update, move |po: &mut PurchaseOrder| po.remove_ordered_part(&part_number))
            .await?;
        Ok(order)
    }

    pub async fn inward_parts(&self, id: Uuid, input: InwardPartsInput) -> AppResult<PurchaseOrder> {
        let (order, _) = self
            .ctx
            .transition(id, Action::Inward, move |po: &mut PurchaseOrder, ledger| {
                po.inward_parts(&input.parts, input.update_stock, ledger)
            })
            .await?;
        Ok(order)
    }

    pub async fn reject_parts(&self, id: Uuid, input: RejectPartsInput) -> AppResult<PurchaseOrder> {
        let (order, _) = self
            .ctx
            .update(id, Action::Reject, move |po: &mut PurchaseOrder| po.reject_parts(&input.parts))
            .await?;
        Ok(order)
    }

    pub async fn record_payment(&self, id: Uuid, payment: Payment) -> AppResult<PurchaseOrder> {
        let (order, _) = self
            .ctx
            .update(id, Action::Pay, |po: &mut PurchaseOrder| po.record_payment(payment))
            .await?;
        Ok(order)
    }

    pub async fn close(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        let (order, _) = self.ctx.update(id, Action::Close, |po: &mut PurchaseOrder| po.close()).await?;
        Ok(order)
    }

    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<PurchaseOrder> {
        let (order, _) = self
            .ctx
            .update(id, Action::Cancel, |po: &mut PurchaseOrder| po.cancel(reason))
            .await?;
        Ok(order)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.ctx.delete(id, |po: &PurchaseOrder| po.ensure_deletable()).await
    }
}
