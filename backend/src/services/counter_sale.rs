//! Counter sale service

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Action, CounterSale, CounterSaleChanges, LineItem, NewCounterSale, Payment, QuickSale};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::line_refs;
use crate::services::store::{self, DocumentFilter};
use crate::services::workflow::WorkflowContext;

#[derive(Debug, Deserialize)]
pub struct RefundSaleInput {
    pub reason: Option<String>,
    /// Defaults to everything paid
    pub amount: Option<Decimal>,
}

#[derive(Clone)]
pub struct CounterSaleService {
    ctx: WorkflowContext,
}

impl CounterSaleService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewCounterSale, created_by: Option<Uuid>) -> AppResult<CounterSale> {
        self.ctx.create(|sale_no| CounterSale::new(sale_no, input, created_by)).await
    }

    /// Create, deduct and complete in one transaction
    pub async fn quick_sale(&self, input: QuickSale, created_by: Option<Uuid>) -> AppResult<CounterSale> {
        let refs = line_refs(&input.items, &self.ctx.home_workshop);
        self.ctx
            .create_with_stock(refs, move |sale_no, ledger| {
                CounterSale::quick_sale(sale_no, input, ledger, created_by)
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<CounterSale> {
        store::fetch(&self.ctx.db, id).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<CounterSale>> {
        store::list(&self.ctx.db, filter).await
    }

    pub async fn update(&self, id: Uuid, changes: CounterSaleChanges) -> AppResult<CounterSale> {
        let (sale, _) = self
            .ctx
            .update(id, Action::Update, |sale: &mut CounterSale| sale.update(changes))
            .await?;
        Ok(sale)
    }

    pub async fn add_items(&self, id: Uuid, items: Vec<LineItem>) -> AppResult<CounterSale> {
        let (sale, _) = self
            .ctx
            .update(id, Action::Update, |sale: &mut CounterSale| sale.add_items(items))
            .await?;
        Ok(sale)
    }

    pub async fn remove_item(&self, id: Uuid, index: usize) -> AppResult<(CounterSale, LineItem)> {
        self.ctx
            .update(id, Action::Update, move |sale: &mut CounterSale| sale.remove_item(index))
            .await
    }

    pub async fn complete_sale(&self, id: Uuid) -> AppResult<CounterSale> {
        let (sale, _) = self
            .ctx
            .transition(id, Action::Complete, |sale: &mut CounterSale, ledger| sale.complete_sale(ledger))
            .await?;
        Ok(sale)
    }

    pub async fn add_payment(&self, id: Uuid, payment: Payment) -> AppResult<CounterSale> {
        let (sale, _) = self
            .ctx
            .update(id, Action::Pay, |sale: &mut CounterSale| sale.add_payment(payment))
            .await?;
        Ok(sale)
    }

    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<CounterSale> {
        let (sale, _) = self
            .ctx
            .transition(id, Action::Cancel, move |sale: &mut CounterSale, ledger| sale.cancel(reason, ledger))
            .await?;
        Ok(sale)
    }

    pub async fn refund(&self, id: Uuid, input: RefundSaleInput) -> AppResult<CounterSale> {
        let (sale, _) = self
            .ctx
            .transition(id, Action::Refund, move |sale: &mut CounterSale, ledger| {
                sale.refund(input.reason, input.amount, ledger)
            })
            .await?;
        Ok(sale)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.ctx.delete(id, |sale: &CounterSale| sale.ensure_deletable()).await
    }
}
