//! Stock issue service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    Action, IssueAllOutcome, IssueItem, LineInput, NewStockIssue, PartQuantity, StockIssue, StockIssueChanges,
    Vehicle, WorkflowResult,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::line_refs;
use crate::services::store::{self, DocumentFilter};
use crate::services::workflow::WorkflowContext;

/// Issue request; each line is resolved against stock at creation
#[derive(Debug, Deserialize)]
pub struct CreateStockIssueInput {
    pub job_card_no: Option<String>,
    pub job_card_id: Option<Uuid>,
    pub reg_no: Option<String>,
    #[serde(default)]
    pub vehicle: Vehicle,
    pub issued_to: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub items: Vec<LineInput>,
    pub notes: Option<String>,
}

/// Edits to an issue nothing has been issued from yet. New items are
/// resolved against stock like at creation.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateStockIssueInput {
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub vehicle: Option<Vehicle>,
    pub issued_to: Option<String>,
    pub items: Option<Vec<LineInput>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssuePartsInput {
    pub parts: Vec<PartQuantity>,
}

#[derive(Clone)]
pub struct StockIssueService {
    ctx: WorkflowContext,
}

impl StockIssueService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: CreateStockIssueInput, created_by: Option<Uuid>) -> AppResult<StockIssue> {
        let home = self.ctx.home_workshop.clone();
        let refs = line_refs(&input.items, &home);
        self.ctx
            .create_with_stock(refs, move |issue_no, ledger| {
                let items = input
                    .items
                    .iter()
                    .map(|line| IssueItem::resolve(&*ledger, &home, line))
                    .collect::<WorkflowResult<Vec<_>>>()?;
                StockIssue::new(
                    issue_no,
                    NewStockIssue {
                        job_card_no: input.job_card_no,
                        job_card_id: input.job_card_id,
                        reg_no: input.reg_no,
                        vehicle: input.vehicle,
                        issued_to: input.issued_to,
                        issue_date: input.issue_date,
                        items,
                        notes: input.notes,
                    },
                    created_by,
                )
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockIssue> {
        store::fetch(&self.ctx.db, id).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> AppResult<Vec<StockIssue>> {
        store::list(&self.ctx.db, filter).await
    }

    pub async fn update(&self, id: Uuid, input: UpdateStockIssueInput) -> AppResult<StockIssue> {
        let home = self.ctx.home_workshop.clone();
        let refs = input.items.as_deref().map(|lines| line_refs(lines, &home)).unwrap_or_default();
        let (issue, _) = self
            .ctx
            .transition_with_refs(id, Action::Update, refs, move |issue: &mut StockIssue, ledger| {
                let items = match &input.items {
                    Some(lines) => Some(
                        lines
                            .iter()
                            .map(|line| IssueItem::resolve(&*ledger, &home, line))
                            .collect::<WorkflowResult<Vec<_>>>()?,
                    ),
                    None => None,
                };
                issue.update(StockIssueChanges {
                    job_card_no: input.job_card_no,
                    reg_no: input.reg_no,
                    vehicle: input.vehicle,
                    issued_to: input.issued_to,
                    items,
                    notes: input.notes,
                })
            })
            .await?;
        Ok(issue)
    }

    pub async fn issue_parts(&self, id: Uuid, input: IssuePartsInput, issued_by: Option<Uuid>) -> AppResult<StockIssue> {
        let (issue, _) = self
            .ctx
            .transition(id, Action::Issue, move |issue: &mut StockIssue, ledger| {
                issue.issue_parts(&input.parts, ledger, issued_by)
            })
            .await?;
        Ok(issue)
    }

    /// Issue whatever can be issued; per-item shortfalls are reported back
    pub async fn issue_all_parts(
        &self,
        id: Uuid,
        issued_by: Option<Uuid>,
    ) -> AppResult<(StockIssue, IssueAllOutcome)> {
        let (issue, outcome) = self
            .ctx
            .transition(id, Action::Issue, move |issue: &mut StockIssue, ledger| {
                issue.issue_all_parts(ledger, issued_by)
            })
            .await?;
        for failure in &outcome.failures {
            tracing::warn!(issue_no = %issue.issue_no, part_number = %failure.part_number, "not issued: {}", failure.reason);
        }
        Ok((issue, outcome))
    }

    pub async fn return_parts(&self, id: Uuid, input: IssuePartsInput) -> AppResult<StockIssue> {
        let (issue, _) = self
            .ctx
            .transition(id, Action::Return, move |issue: &mut StockIssue, ledger| {
                issue.return_parts(&input.parts, ledger)
            })
            .await?;
        Ok(issue)
    }

    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<StockIssue> {
        let (issue, _) = self
            .ctx
            .transition(id, Action::Cancel, move |issue: &mut StockIssue, ledger| issue.cancel(reason, ledger))
            .await?;
        Ok(issue)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.ctx.delete(id, |issue: &StockIssue| issue.ensure_deletable()).await
    }
}
