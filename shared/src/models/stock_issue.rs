//! Stock issue models
//!
//! Parts issued from stores against a job card. Issues are created
//! pending and move stock per operation; the document status is derived
//! from the item quantities.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{ensure_available, MovementReason, StockDemand, StockLedger, StockRef};
use crate::models::{LineInput, PartQuantity, Resolution, StockItem};
use crate::types::{append_note, round_money, DocumentKind, Vehicle};
use crate::validation;
use crate::workflow::{Action, QuantityFlow, StatusMachine, StockDirection, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockIssueStatus {
    Pending,
    PartiallyIssued,
    Issued,
    PartiallyReturned,
    Returned,
    Cancelled,
}

impl StockIssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyIssued => "partially_issued",
            Self::Issued => "issued",
            Self::PartiallyReturned => "partially_returned",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StockIssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::PartiallyIssued => write!(f, "Partially Issued"),
            Self::Issued => write!(f, "Issued"),
            Self::PartiallyReturned => write!(f, "Partially Returned"),
            Self::Returned => write!(f, "Returned"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueItemStatus {
    #[default]
    Pending,
    PartiallyIssued,
    Issued,
    Returned,
}

/// One requested part with its issued and returned quantities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueItem {
    pub stock_id: Option<Uuid>,
    pub part_number: String,
    pub part_name: String,
    pub brand: Option<String>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub requested_qty: i32,
    #[serde(default)]
    pub issued_qty: i32,
    #[serde(default)]
    pub return_qty: i32,
    #[serde(default)]
    pub pending_qty: i32,
    #[serde(default)]
    pub status: IssueItemStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

impl IssueItem {
    pub fn new(part_number: impl Into<String>, part_name: impl Into<String>, requested_qty: i32) -> Self {
        Self {
            stock_id: None,
            part_number: part_number.into(),
            part_name: part_name.into(),
            brand: None,
            purchase_price: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            requested_qty,
            issued_qty: 0,
            return_qty: 0,
            pending_qty: requested_qty,
            status: IssueItemStatus::Pending,
            issued_at: None,
            returned_at: None,
            remarks: None,
        }
    }

    pub fn from_stock(item: &StockItem, requested_qty: i32) -> Self {
        Self {
            stock_id: Some(item.id),
            brand: item.brand.clone(),
            purchase_price: item.purchase_price,
            selling_price: item.selling_price,
            ..Self::new(item.part_number.clone(), item.part_name.clone(), requested_qty)
        }
    }

    /// Resolve a requested line against stock. Issued parts must be
    /// stocked; prices are copied from the stock row.
    pub fn resolve<L: StockLedger + ?Sized>(ledger: &L, workshop: &str, line: &LineInput) -> WorkflowResult<Self> {
        match Resolution::resolve(ledger, workshop, line) {
            Resolution::Resolved(stock) => Ok(Self {
                remarks: line.remarks.clone(),
                ..Self::from_stock(&stock, line.quantity)
            }),
            Resolution::Unresolved(_) => Err(WorkflowError::not_found("stock item", line.key())),
        }
    }

    pub fn margin(&self) -> Decimal {
        self.selling_price - self.purchase_price
    }

    /// Issued units not yet returned
    pub fn net_issued(&self) -> i32 {
        self.issued_qty - self.return_qty
    }

    fn recalculate(&mut self) {
        self.pending_qty = (self.requested_qty - self.issued_qty - self.return_qty).max(0);
        self.status = if self.issued_qty > 0 && self.return_qty >= self.issued_qty {
            IssueItemStatus::Returned
        } else if self.issued_qty >= self.requested_qty {
            IssueItemStatus::Issued
        } else if self.issued_qty > 0 {
            IssueItemStatus::PartiallyIssued
        } else {
            IssueItemStatus::Pending
        };
    }

    fn take_prices_from(&mut self, stock: &StockItem) {
        self.stock_id = Some(stock.id);
        self.purchase_price = stock.purchase_price;
        self.selling_price = stock.selling_price;
    }
}

/// Quantity and valuation totals; values are on issued quantities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IssueTotals {
    pub total_requested_qty: i32,
    pub total_issued_qty: i32,
    pub total_pending_qty: i32,
    pub total_return_qty: i32,
    pub total_purchase_value: Decimal,
    pub total_selling_value: Decimal,
    pub total_margin_value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockIssue {
    pub id: Uuid,
    pub issue_no: String,
    pub issue_date: DateTime<Utc>,
    pub job_card_no: Option<String>,
    pub job_card_id: Option<Uuid>,
    pub reg_no: Option<String>,
    #[serde(default)]
    pub vehicle: Vehicle,
    pub issued_to: Option<String>,
    pub items: Vec<IssueItem>,
    pub totals: IssueTotals,
    pub status: StockIssueStatus,
    pub stock_deducted: bool,
    pub issued_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockIssue {
    pub job_card_no: Option<String>,
    pub job_card_id: Option<Uuid>,
    pub reg_no: Option<String>,
    #[serde(default)]
    pub vehicle: Vehicle,
    pub issued_to: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub items: Vec<IssueItem>,
    pub notes: Option<String>,
}

/// Changes allowed before anything has been issued. `items` replaces the
/// whole item list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StockIssueChanges {
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub vehicle: Option<Vehicle>,
    pub issued_to: Option<String>,
    pub items: Option<Vec<IssueItem>>,
    pub notes: Option<String>,
}

/// Result of a best-effort issue of everything outstanding
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct IssueAllOutcome {
    pub issued: Vec<PartQuantity>,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFailure {
    pub part_number: String,
    pub reason: String,
}

const OPEN: &[StockIssueStatus] = &[
    StockIssueStatus::Pending,
    StockIssueStatus::PartiallyIssued,
    StockIssueStatus::Issued,
    StockIssueStatus::PartiallyReturned,
    StockIssueStatus::Returned,
];

impl StatusMachine for StockIssue {
    type Status = StockIssueStatus;
    const KIND: DocumentKind = DocumentKind::StockIssue;
    const TRANSITIONS: &'static [Transition<StockIssueStatus>] = &[
        Transition {
            action: Action::Update,
            from: &[StockIssueStatus::Pending],
        },
        Transition {
            action: Action::Issue,
            from: OPEN,
        },
        Transition {
            action: Action::Return,
            from: OPEN,
        },
        Transition {
            action: Action::Cancel,
            from: OPEN,
        },
        Transition {
            action: Action::Delete,
            from: OPEN,
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.issue_no
    }

    fn status(&self) -> StockIssueStatus {
        self.status
    }
}

impl QuantityFlow for StockIssue {
    const DIRECTION: StockDirection = StockDirection::Outbound;

    fn stock_refs(&self, home_workshop: &str) -> Vec<StockRef> {
        self.items.iter().map(|i| item_ref(i, home_workshop)).collect()
    }
}

fn item_ref(item: &IssueItem, workshop: &str) -> StockRef {
    StockRef {
        stock_id: item.stock_id,
        workshop: workshop.to_string(),
        part_number: item.part_number.clone(),
    }
}

fn validate_items(items: &[IssueItem]) -> WorkflowResult<()> {
    if items.is_empty() {
        return Err(WorkflowError::EmptyDocument {
            kind: DocumentKind::StockIssue,
        });
    }
    for item in items {
        validation::validate_part_number(&item.part_number)?;
        validation::validate_quantity("requested_qty", item.requested_qty)?;
    }
    validation::ensure_unique_parts(items.iter().map(|i| i.part_number.as_str()))
}

fn fresh(items: Vec<IssueItem>) -> Vec<IssueItem> {
    items
        .into_iter()
        .map(|i| IssueItem {
            issued_qty: 0,
            return_qty: 0,
            ..i
        })
        .collect()
}

impl StockIssue {
    pub fn new(issue_no: String, input: NewStockIssue, created_by: Option<Uuid>) -> WorkflowResult<Self> {
        validate_items(&input.items)?;

        let now = Utc::now();
        let mut issue = Self {
            id: Uuid::new_v4(),
            issue_no,
            issue_date: input.issue_date.unwrap_or(now),
            job_card_no: input.job_card_no,
            job_card_id: input.job_card_id,
            reg_no: input.reg_no,
            vehicle: input.vehicle,
            issued_to: input.issued_to,
            items: fresh(input.items),
            totals: IssueTotals::default(),
            status: StockIssueStatus::Pending,
            stock_deducted: false,
            issued_by: None,
            cancelled_at: None,
            cancel_reason: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        issue.recalculate();
        Ok(issue)
    }

    /// Re-derive item statuses, totals and the document status
    pub fn recalculate(&mut self) {
        let mut totals = IssueTotals::default();
        for item in &mut self.items {
            item.recalculate();
            let issued = Decimal::from(item.issued_qty);
            totals.total_requested_qty += item.requested_qty;
            totals.total_issued_qty += item.issued_qty;
            totals.total_pending_qty += item.pending_qty;
            totals.total_return_qty += item.return_qty;
            totals.total_purchase_value += issued * item.purchase_price;
            totals.total_selling_value += issued * item.selling_price;
        }
        totals.total_purchase_value = round_money(totals.total_purchase_value);
        totals.total_selling_value = round_money(totals.total_selling_value);
        totals.total_margin_value = totals.total_selling_value - totals.total_purchase_value;
        self.totals = totals;

        if self.status != StockIssueStatus::Cancelled {
            self.status = self.derive_status();
        }
    }

    /// Edit the job-card details or replace the items. Only allowed while
    /// nothing has been issued.
    pub fn update(&mut self, changes: StockIssueChanges) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        if self.stock_deducted {
            return Err(WorkflowError::InvalidTransition {
                kind: Self::KIND,
                document_no: self.issue_no.clone(),
                from: format!("{} with stock deducted", self.status),
                action: Action::Update,
            });
        }
        if let Some(items) = &changes.items {
            validate_items(items)?;
        }

        if changes.job_card_no.is_some() {
            self.job_card_no = changes.job_card_no;
        }
        if changes.reg_no.is_some() {
            self.reg_no = changes.reg_no;
        }
        if let Some(vehicle) = changes.vehicle {
            self.vehicle = vehicle;
        }
        if changes.issued_to.is_some() {
            self.issued_to = changes.issued_to;
        }
        if let Some(items) = changes.items {
            self.items = fresh(items);
        }
        if changes.notes.is_some() {
            self.notes = changes.notes;
        }
        self.recalculate();
        self.updated_at = Utc::now();
        Ok(())
    }

    fn derive_status(&self) -> StockIssueStatus {
        let all_returned = self.items.iter().all(|i| i.status == IssueItemStatus::Returned);
        let some_returned = self.items.iter().any(|i| i.return_qty > 0);
        let all_issued = self
            .items
            .iter()
            .all(|i| matches!(i.status, IssueItemStatus::Issued | IssueItemStatus::Returned));
        let some_issued = self.items.iter().any(|i| i.issued_qty > 0);

        if all_returned && self.totals.total_issued_qty > 0 {
            StockIssueStatus::Returned
        } else if some_returned {
            StockIssueStatus::PartiallyReturned
        } else if all_issued {
            StockIssueStatus::Issued
        } else if some_issued {
            StockIssueStatus::PartiallyIssued
        } else {
            StockIssueStatus::Pending
        }
    }

    fn item_index(&self, part_number: &str) -> WorkflowResult<usize> {
        self.items
            .iter()
            .position(|i| i.part_number == part_number)
            .ok_or_else(|| WorkflowError::not_found("issue item", part_number))
    }

    /// Issue the requested quantities. Lines naming the same part are
    /// checked together and nothing moves unless every line can be issued.
    pub fn issue_parts<L: StockLedger + ?Sized>(
        &mut self,
        parts: &[PartQuantity],
        ledger: &mut L,
        issued_by: Option<Uuid>,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Issue)?;
        let home = ledger.home_workshop().to_string();

        let mut in_batch: HashMap<usize, i32> = HashMap::new();
        let mut plan = Vec::with_capacity(parts.len());
        let mut demands = Vec::with_capacity(parts.len());
        for part in parts {
            validation::validate_quantity("quantity", part.quantity)?;
            let index = self.item_index(&part.part_number)?;
            let item = &self.items[index];
            let already = in_batch.entry(index).or_insert(0);
            let max = item.requested_qty - item.issued_qty - *already;
            if part.quantity > max {
                return Err(WorkflowError::ExceedsRequestedQuantity {
                    part_number: part.part_number.clone(),
                    requested: part.quantity,
                    max,
                });
            }
            *already += part.quantity;

            let stock = ledger.resolve(&item_ref(item, &home))?;
            demands.push(StockDemand {
                stock_id: stock.id,
                part_number: part.part_number.clone(),
                quantity: part.quantity,
            });
            plan.push((index, stock.id, part.quantity));
        }
        ensure_available(&*ledger, &demands)?;

        let reason = MovementReason::new(Self::KIND, self.issue_no.clone(), Action::Issue);
        let now = Utc::now();
        for (index, stock_id, quantity) in plan {
            let stock = ledger.adjust(stock_id, Self::DIRECTION.delta(quantity), &reason)?;
            let item = &mut self.items[index];
            item.take_prices_from(stock);
            item.issued_qty += quantity;
            item.issued_at = Some(now);
        }

        self.stock_deducted = true;
        self.issued_by = issued_by.or(self.issued_by);
        self.recalculate();
        self.updated_at = now;
        Ok(())
    }

    /// Issue every outstanding quantity as far as stock allows. Items that
    /// cannot be resolved or have no stock are reported, not fatal.
    pub fn issue_all_parts<L: StockLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        issued_by: Option<Uuid>,
    ) -> WorkflowResult<IssueAllOutcome> {
        self.ensure_can(Action::Issue)?;
        let home = ledger.home_workshop().to_string();
        let reason = MovementReason::new(Self::KIND, self.issue_no.clone(), Action::Issue);
        let now = Utc::now();
        let mut outcome = IssueAllOutcome::default();

        for item in &mut self.items {
            let pending = item.requested_qty - item.issued_qty;
            if pending <= 0 {
                continue;
            }
            let (stock_id, available) = match ledger.resolve(&item_ref(item, &home)) {
                Ok(stock) => (stock.id, stock.quantity_on_hand),
                Err(err) => {
                    outcome.failures.push(ItemFailure {
                        part_number: item.part_number.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            let quantity = pending.min(available);
            if quantity <= 0 {
                outcome.failures.push(ItemFailure {
                    part_number: item.part_number.clone(),
                    reason: WorkflowError::InsufficientStock {
                        part_number: item.part_number.clone(),
                        available,
                        requested: pending,
                    }
                    .to_string(),
                });
                continue;
            }
            match ledger.adjust(stock_id, Self::DIRECTION.delta(quantity), &reason) {
                Ok(stock) => {
                    item.take_prices_from(stock);
                    item.issued_qty += quantity;
                    item.issued_at = Some(now);
                    outcome.issued.push(PartQuantity::new(item.part_number.clone(), quantity));
                }
                Err(err) => outcome.failures.push(ItemFailure {
                    part_number: item.part_number.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        if !outcome.issued.is_empty() {
            self.stock_deducted = true;
            self.issued_by = issued_by.or(self.issued_by);
        }
        self.recalculate();
        self.updated_at = now;
        Ok(outcome)
    }

    /// Take issued parts back into stock
    pub fn return_parts<L: StockLedger + ?Sized>(
        &mut self,
        parts: &[PartQuantity],
        ledger: &mut L,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Return)?;
        let home = ledger.home_workshop().to_string();

        let mut in_batch: HashMap<usize, i32> = HashMap::new();
        let mut plan = Vec::with_capacity(parts.len());
        for part in parts {
            validation::validate_quantity("quantity", part.quantity)?;
            let index = self.item_index(&part.part_number)?;
            let item = &self.items[index];
            let already = in_batch.entry(index).or_insert(0);
            let max = item.net_issued() - *already;
            if part.quantity > max {
                return Err(WorkflowError::ExceedsIssuedQuantity {
                    part_number: part.part_number.clone(),
                    requested: part.quantity,
                    max,
                });
            }
            *already += part.quantity;
            let stock_id = ledger.resolve(&item_ref(item, &home))?.id;
            plan.push((index, stock_id, part.quantity, part.note.clone()));
        }

        let reason = MovementReason::new(Self::KIND, self.issue_no.clone(), Action::Return);
        let now = Utc::now();
        for (index, stock_id, quantity, note) in plan {
            ledger.adjust(stock_id, Self::DIRECTION.reversed().delta(quantity), &reason)?;
            let item = &mut self.items[index];
            item.return_qty += quantity;
            item.returned_at = Some(now);
            if let Some(note) = note {
                append_note(&mut item.remarks, format!("Returned: {}", note));
            }
        }
        self.recalculate();
        self.updated_at = now;
        Ok(())
    }

    /// Cancel the issue, putting back whatever is still out
    pub fn cancel<L: StockLedger + ?Sized>(&mut self, reason: Option<String>, ledger: &mut L) -> WorkflowResult<()> {
        self.ensure_can(Action::Cancel)?;

        if self.stock_deducted {
            let home = ledger.home_workshop().to_string();
            let mut plan = Vec::new();
            for item in &self.items {
                let outstanding = item.net_issued();
                if outstanding > 0 {
                    plan.push((ledger.resolve(&item_ref(item, &home))?.id, outstanding));
                }
            }
            let movement = MovementReason::new(Self::KIND, self.issue_no.clone(), Action::Cancel);
            for (stock_id, quantity) in plan {
                ledger.adjust(stock_id, Self::DIRECTION.reversed().delta(quantity), &movement)?;
            }
        }

        let now = Utc::now();
        self.status = StockIssueStatus::Cancelled;
        self.cancelled_at = Some(now);
        if let Some(reason) = &reason {
            append_note(&mut self.notes, format!("Cancelled: {}", reason));
        }
        self.cancel_reason = reason;
        self.recalculate();
        self.updated_at = now;
        Ok(())
    }

    /// Issues that have moved stock must be cancelled instead
    pub fn ensure_deletable(&self) -> WorkflowResult<()> {
        self.ensure_can(Action::Delete)?;
        if self.stock_deducted {
            return Err(WorkflowError::InvalidTransition {
                kind: Self::KIND,
                document_no: self.issue_no.clone(),
                from: format!("{} with stock deducted", self.status),
                action: Action::Delete,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue() -> StockIssue {
        StockIssue::new(
            "ISS24050001".to_string(),
            NewStockIssue {
                job_card_no: Some("JC-9".to_string()),
                job_card_id: None,
                reg_no: None,
                vehicle: Vehicle::default(),
                issued_to: Some("Bay 2".to_string()),
                issue_date: None,
                items: vec![IssueItem::new("A", "Part A", 3), IssueItem::new("B", "Part B", 2)],
                notes: None,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_new_issue_is_pending() {
        let doc = issue();
        assert_eq!(doc.status, StockIssueStatus::Pending);
        assert_eq!(doc.totals.total_pending_qty, 5);
    }

    #[test]
    fn test_issue_requires_items() {
        let result = StockIssue::new(
            "ISS1".to_string(),
            NewStockIssue {
                job_card_no: None,
                job_card_id: None,
                reg_no: None,
                vehicle: Vehicle::default(),
                issued_to: None,
                issue_date: None,
                items: vec![],
                notes: None,
            },
            None,
        );
        assert!(matches!(result, Err(WorkflowError::EmptyDocument { .. })));
    }

    #[test]
    fn test_status_precedence() {
        let mut doc = issue();
        doc.items[0].issued_qty = 3;
        doc.recalculate();
        assert_eq!(doc.status, StockIssueStatus::PartiallyIssued);

        doc.items[1].issued_qty = 2;
        doc.recalculate();
        assert_eq!(doc.status, StockIssueStatus::Issued);

        doc.items[1].return_qty = 1;
        doc.recalculate();
        assert_eq!(doc.status, StockIssueStatus::PartiallyReturned);

        doc.items[0].return_qty = 3;
        doc.items[1].return_qty = 2;
        doc.recalculate();
        assert_eq!(doc.items[0].status, IssueItemStatus::Returned);
        assert_eq!(doc.status, StockIssueStatus::Returned);
    }

    #[test]
    fn test_requested_lines_resolve_against_stock() {
        use crate::ledger::InMemoryLedger;
        use crate::models::{NewStockItem, TaxType};

        let stock = StockItem::new(
            NewStockItem {
                part_number: "SP-4".to_string(),
                part_name: "Spark Plug".to_string(),
                brand: Some("NGK".to_string()),
                category: None,
                workshop: None,
                opening_quantity: 10,
                purchase_price: Decimal::from(80),
                selling_price: Decimal::from(120),
                tax_type: TaxType::Gst,
                tax_percent: Decimal::from(18),
                rack_no: None,
                min_stock_level: 0,
                max_stock_level: None,
                location: None,
            },
            "main",
        )
        .unwrap();
        let ledger = InMemoryLedger::with_items("main", vec![stock.clone()]).unwrap();

        let item = IssueItem::resolve(&ledger, "main", &LineInput::for_part("SP-4", 4)).unwrap();
        assert_eq!(item.stock_id, Some(stock.id));
        assert_eq!(item.selling_price, Decimal::from(120));
        assert_eq!(item.pending_qty, 4);
        assert_eq!(item.margin(), Decimal::from(40));

        let missing = IssueItem::resolve(&ledger, "main", &LineInput::for_part("XX", 1));
        assert!(matches!(missing, Err(WorkflowError::NotFound { .. })));
    }

    #[test]
    fn test_untouched_issue_can_be_deleted() {
        let doc = issue();
        assert!(doc.ensure_deletable().is_ok());
    }

    #[test]
    fn test_update_only_before_issuing() {
        let mut doc = issue();
        doc.update(StockIssueChanges {
            issued_to: Some("Bay 5".to_string()),
            items: Some(vec![IssueItem::new("A", "Part A", 4)]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(doc.issued_to.as_deref(), Some("Bay 5"));
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.totals.total_pending_qty, 4);

        assert!(matches!(
            doc.update(StockIssueChanges {
                items: Some(vec![]),
                ..Default::default()
            }),
            Err(WorkflowError::EmptyDocument { .. })
        ));

        doc.items[0].issued_qty = 1;
        doc.stock_deducted = true;
        doc.recalculate();
        assert!(matches!(
            doc.update(StockIssueChanges::default()),
            Err(WorkflowError::InvalidTransition { action: Action::Update, .. })
        ));
    }
}
