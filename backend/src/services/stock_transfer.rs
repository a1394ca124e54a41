//! Inter-workshop stock transfer service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    Action, DispatchDetails, ItemReceipt, LineItem, NewStockTransfer, QuantityFlow, StatusMachine, StockItem,
    StockTransfer, WorkflowError,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::store::{self, DocumentFilter};
use crate::services::workflow::WorkflowContext;

#[derive(Debug, Default, Deserialize)]
pub struct ReceiveTransferInput {
    /// Items without a receipt are taken as fully received
    #[serde(default)]
    pub receipts: Vec<ItemReceipt>,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveredTransferInput {
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct StockTransferService {
    ctx: WorkflowContext,
}

impl StockTransferService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewStockTransfer, created_by: Option<Uuid>) -> AppResult<StockTransfer> {
        self.ctx.create(|transfer_no| StockTransfer::new(transfer_no, input, created_by)).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockTransfer> {
        store::fetch(&self.ctx.db, id).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<StockTransfer>> {
        store::list(&self.ctx.db, filter).await
    }

    pub async fn update_items(&self, id: Uuid, items: Vec<LineItem>) -> AppResult<StockTransfer> {
        let (transfer, _) = self
            .ctx
            .update(id, Action::Update, |transfer: &mut StockTransfer| transfer.update_items(items))
            .await?;
        Ok(transfer)
    }

    pub async fn submit_for_approval(&self, id: Uuid) -> AppResult<StockTransfer> {
        let (transfer, _) = self
            .ctx
            .update(id, Action::Submit, |transfer: &mut StockTransfer| transfer.submit_for_approval())
            .await?;
        Ok(transfer)
    }

    /// Approve after checking the source can cover every item
    pub async fn approve(&self, id: Uuid, approved_by: Option<Uuid>) -> AppResult<StockTransfer> {
        let (transfer, _) = self
            .ctx
            .transition(id, Action::Approve, move |transfer: &mut StockTransfer, ledger| {
                transfer.approve(&*ledger, approved_by)
            })
            .await?;
        Ok(transfer)
    }

    pub async fn dispatch(
        &self,
        id: Uuid,
        details: DispatchDetails,
        dispatched_by: Option<Uuid>,
    ) -> AppResult<StockTransfer> {
        let (transfer, _) = self
            .ctx
            .transition(id, Action::Dispatch, move |transfer: &mut StockTransfer, ledger| {
                transfer.dispatch(ledger, details, dispatched_by)
            })
            .await?;
        Ok(transfer)
    }

    pub async fn mark_delivered(&self, id: Uuid, input: DeliveredTransferInput) -> AppResult<StockTransfer> {
        let (transfer, _) = self
            .ctx
            .update(id, Action::Deliver, |transfer: &mut StockTransfer| {
                transfer.mark_delivered(input.delivered_at)
            })
            .await?;
        Ok(transfer)
    }

    /// Create destination rows for parts the receiving workshop has never
    /// stocked, copied from the source row with zero quantity. Runs outside
    /// the receiving transaction; a row provisioned concurrently is fine.
    async fn provision_destination(&self, transfer: &StockTransfer) -> AppResult<()> {
        let mut conn = self.ctx.db.acquire().await?;
        for item in &transfer.items {
            let part_number = &item.line.part_number;
            if ledger::find_part(&mut conn, &transfer.to_workshop, part_number).await?.is_some() {
                continue;
            }
            let source: StockItem = ledger::find_part(&mut conn, &transfer.from_workshop, part_number)
                .await?
                .ok_or_else(|| WorkflowError::not_found("stock item", shared::workshop_key(&transfer.from_workshop, part_number)))?;
            let provisioned = source.provision_for(&transfer.to_workshop);
            match ledger::insert_stock_item(&mut conn, &provisioned).await {
                Ok(()) => tracing::info!(
                    workshop = %provisioned.workshop,
                    part_number = %provisioned.part_number,
                    transfer_no = %transfer.transfer_no,
                    "destination stock row provisioned"
                ),
                Err(AppError::Workflow(WorkflowError::DuplicateKey { .. })) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Receive at the destination workshop
    pub async fn receive(
        &self,
        id: Uuid,
        input: ReceiveTransferInput,
        received_by: Option<Uuid>,
    ) -> AppResult<StockTransfer> {
        let pending: StockTransfer = store::fetch(&self.ctx.db, id).await?;
        pending.ensure_can(Action::Receive)?;
        self.provision_destination(&pending).await?;

        let mut tx = self.ctx.db.begin().await?;
        let mut transfer: StockTransfer = store::fetch_for_update(&mut *tx, id).await?;
        transfer.ensure_can(Action::Receive)?;

        let refs = transfer.stock_refs(&self.ctx.home_workshop);
        let mut snapshot = ledger::lock_snapshot(&mut tx, &self.ctx.home_workshop, &refs).await?;
        transfer.receive(&input.receipts, input.remarks, &mut snapshot, received_by)?;

        let journal = snapshot.take_journal();
        self.ctx.finish(tx, &transfer, Action::Receive, &journal).await?;
        Ok(transfer)
    }

    /// Cancel before receipt; dispatched units go back to the source
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<StockTransfer> {
        let (transfer, _) = self
            .ctx
            .transition(id, Action::Cancel, move |transfer: &mut StockTransfer, ledger| {
                transfer.cancel(reason, ledger)
            })
            .await?;
        Ok(transfer)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.ctx.delete(id, |transfer: &StockTransfer| transfer.ensure_deletable()).await
    }
}
