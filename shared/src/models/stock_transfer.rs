//! Stock transfer models
//!
//! Moves parts between workshops in two halves: dispatch takes stock out
//! of the source workshop and receipt adds it to the destination. Units
//! reported damaged on receipt are written off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{ensure_available, MovementReason, StockDemand, StockLedger, StockRef};
use crate::models::{LineItem, StockItem};
use crate::totals::{compute_totals, DocumentTotals};
use crate::types::{append_note, DocumentKind};
use crate::validation;
use crate::workflow::{Action, QuantityFlow, StatusMachine, StockDirection, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockTransferStatus {
    Draft,
    PendingApproval,
    Approved,
    InTransit,
    Delivered,
    Received,
    Cancelled,
}

impl StockTransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StockTransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Draft => "Draft",
            Self::PendingApproval => "Pending Approval",
            Self::Approved => "Approved",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
            Self::Received => "Received",
            Self::Cancelled => "Cancelled",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferItemStatus {
    #[default]
    Pending,
    Sent,
    Received,
    Partial,
    Damaged,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    StockBalancing,
    UrgentRequirement,
    WorkshopClosure,
    ExcessStock,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    Vehicle,
    Courier,
    HandCarry,
    Other,
}

/// A transferred part; `line.quantity` is the quantity to send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferItem {
    #[serde(flatten)]
    pub line: LineItem,
    #[serde(default)]
    pub sent_qty: i32,
    #[serde(default)]
    pub received_qty: i32,
    #[serde(default)]
    pub damaged_qty: i32,
    #[serde(default)]
    pub status: TransferItemStatus,
}

impl TransferItem {
    pub fn new(line: LineItem) -> Self {
        Self {
            line,
            sent_qty: 0,
            received_qty: 0,
            damaged_qty: 0,
            status: TransferItemStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DispatchDetails {
    pub transfer_method: Option<TransferMethod>,
    pub vehicle_no: Option<String>,
    pub driver_name: Option<String>,
    pub driver_contact: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

/// What the destination reports for one part. Missing quantities mean
/// everything sent arrived intact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemReceipt {
    pub part_number: String,
    pub received_qty: Option<i32>,
    pub damaged_qty: Option<i32>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransfer {
    pub id: Uuid,
    pub transfer_no: String,
    pub transfer_date: DateTime<Utc>,
    pub from_workshop: String,
    pub to_workshop: String,
    pub items: Vec<TransferItem>,
    pub totals: DocumentTotals,
    pub transfer_reason: Option<TransferReason>,
    #[serde(default)]
    pub dispatch: DispatchDetails,
    pub status: StockTransferStatus,
    pub source_stock_deducted: bool,
    pub destination_stock_added: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_by: Option<Uuid>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub receiver_remarks: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockTransfer {
    pub from_workshop: String,
    pub to_workshop: String,
    pub transfer_date: Option<DateTime<Utc>>,
    pub items: Vec<LineItem>,
    pub transfer_reason: Option<TransferReason>,
    pub notes: Option<String>,
}

/// Statuses in which the transfer has not yet been received
const UNRECEIVED: &[StockTransferStatus] = &[
    StockTransferStatus::Draft,
    StockTransferStatus::PendingApproval,
    StockTransferStatus::Approved,
    StockTransferStatus::InTransit,
    StockTransferStatus::Delivered,
];

impl StatusMachine for StockTransfer {
    type Status = StockTransferStatus;
    const KIND: DocumentKind = DocumentKind::StockTransfer;
    const TRANSITIONS: &'static [Transition<StockTransferStatus>] = &[
        Transition {
            action: Action::Update,
            from: &[
                StockTransferStatus::Draft,
                StockTransferStatus::PendingApproval,
                StockTransferStatus::Approved,
            ],
        },
        Transition {
            action: Action::Submit,
            from: &[StockTransferStatus::Draft],
        },
        Transition {
            action: Action::Approve,
            from: &[StockTransferStatus::PendingApproval],
        },
        Transition {
            action: Action::Dispatch,
            from: &[StockTransferStatus::Approved],
        },
        Transition {
            action: Action::Deliver,
            from: &[StockTransferStatus::InTransit],
        },
        Transition {
            action: Action::Receive,
            from: &[StockTransferStatus::InTransit, StockTransferStatus::Delivered],
        },
        Transition {
            action: Action::Cancel,
            from: UNRECEIVED,
        },
        Transition {
            action: Action::Delete,
            from: &[StockTransferStatus::Draft],
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.transfer_no
    }

    fn status(&self) -> StockTransferStatus {
        self.status
    }
}

impl QuantityFlow for StockTransfer {
    const DIRECTION: StockDirection = StockDirection::Outbound;

    /// Source rows plus destination rows looked up by part number
    fn stock_refs(&self, _home_workshop: &str) -> Vec<StockRef> {
        let mut refs: Vec<StockRef> = self.items.iter().map(|i| self.source_ref(i)).collect();
        refs.extend(self.items.iter().map(|i| self.destination_ref(i)));
        refs
    }
}

impl StockTransfer {
    pub fn new(transfer_no: String, input: NewStockTransfer, created_by: Option<Uuid>) -> WorkflowResult<Self> {
        validation::validate_workshops(&input.from_workshop, &input.to_workshop)?;
        validation::validate_lines(&input.items)?;
        validation::ensure_unique_parts(input.items.iter().map(|i| i.part_number.as_str()))?;

        let now = Utc::now();
        let mut transfer = Self {
            id: Uuid::new_v4(),
            transfer_no,
            transfer_date: input.transfer_date.unwrap_or(now),
            from_workshop: input.from_workshop.trim().to_string(),
            to_workshop: input.to_workshop.trim().to_string(),
            items: input.items.into_iter().map(TransferItem::new).collect(),
            totals: DocumentTotals::default(),
            transfer_reason: input.transfer_reason,
            dispatch: DispatchDetails::default(),
            status: StockTransferStatus::Draft,
            source_stock_deducted: false,
            destination_stock_added: false,
            approved_by: None,
            approved_at: None,
            dispatched_by: None,
            dispatched_at: None,
            actual_delivery_date: None,
            received_by: None,
            received_at: None,
            receiver_remarks: None,
            cancelled_at: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        transfer.recalculate();
        Ok(transfer)
    }

    /// Source rows are always looked up in `from_workshop`; a line's own
    /// `stock_id` never redirects the deduction elsewhere
    pub fn source_ref(&self, item: &TransferItem) -> StockRef {
        StockRef {
            stock_id: None,
            workshop: self.from_workshop.clone(),
            part_number: item.line.part_number.clone(),
        }
    }

    /// The source row for an item. A line pinned to a row outside the
    /// source workshop is rejected.
    fn source_stock<'l, L: StockLedger + ?Sized>(
        &self,
        ledger: &'l L,
        item: &TransferItem,
    ) -> WorkflowResult<&'l StockItem> {
        let stock = ledger.resolve(&self.source_ref(item))?;
        match item.line.stock_id {
            Some(pinned) if pinned != stock.id => Err(WorkflowError::validation(
                "stock_id",
                format!(
                    "{} is not the {} row for {}",
                    pinned, self.from_workshop, item.line.part_number
                ),
            )),
            _ => Ok(stock),
        }
    }

    pub fn destination_ref(&self, item: &TransferItem) -> StockRef {
        StockRef {
            stock_id: None,
            workshop: self.to_workshop.clone(),
            part_number: item.line.part_number.clone(),
        }
    }

    pub fn recalculate(&mut self) {
        self.totals = compute_totals(self.items.iter_mut().map(|i| &mut i.line), None, &[]);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn update_items(&mut self, items: Vec<LineItem>) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        validation::validate_lines(&items)?;
        validation::ensure_unique_parts(items.iter().map(|i| i.part_number.as_str()))?;
        self.items = items.into_iter().map(TransferItem::new).collect();
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn submit_for_approval(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::Submit)?;
        if self.items.is_empty() {
            return Err(WorkflowError::EmptyDocument { kind: Self::KIND });
        }
        self.status = StockTransferStatus::PendingApproval;
        self.touch();
        Ok(())
    }

    fn source_demands<L: StockLedger + ?Sized>(&self, ledger: &L) -> WorkflowResult<Vec<StockDemand>> {
        let mut demands = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let stock = self.source_stock(ledger, item)?;
            demands.push(StockDemand {
                stock_id: stock.id,
                part_number: item.line.part_number.clone(),
                quantity: item.line.quantity,
            });
        }
        Ok(demands)
    }

    /// Approve after checking the source can cover every item. Nothing
    /// moves until dispatch.
    pub fn approve<L: StockLedger + ?Sized>(&mut self, ledger: &L, approved_by: Option<Uuid>) -> WorkflowResult<()> {
        self.ensure_can(Action::Approve)?;
        let demands = self.source_demands(&*ledger)?;
        ensure_available(&*ledger, &demands)?;

        let now = Utc::now();
        self.status = StockTransferStatus::Approved;
        self.approved_by = approved_by;
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Take every item out of the source workshop, all or nothing
    pub fn dispatch<L: StockLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        details: DispatchDetails,
        dispatched_by: Option<Uuid>,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Dispatch)?;
        let demands = self.source_demands(&*ledger)?;
        ensure_available(&*ledger, &demands)?;

        let reason = MovementReason::new(Self::KIND, self.transfer_no.clone(), Action::Dispatch);
        for (item, demand) in self.items.iter_mut().zip(&demands) {
            ledger.adjust(demand.stock_id, Self::DIRECTION.delta(demand.quantity), &reason)?;
            item.line.stock_id = Some(demand.stock_id);
            item.sent_qty = demand.quantity;
            item.status = TransferItemStatus::Sent;
        }

        let now = Utc::now();
        self.source_stock_deducted = true;
        self.dispatch = details;
        self.status = StockTransferStatus::InTransit;
        self.dispatched_by = dispatched_by;
        self.dispatched_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_delivered(&mut self, delivered_at: Option<DateTime<Utc>>) -> WorkflowResult<()> {
        self.ensure_can(Action::Deliver)?;
        self.actual_delivery_date = delivered_at.or_else(|| Some(Utc::now()));
        self.status = StockTransferStatus::Delivered;
        self.touch();
        Ok(())
    }

    /// Work out received and damaged units per item from the receipts.
    /// Items without a receipt arrived in full.
    fn plan_receipt(&self, receipts: &[ItemReceipt]) -> WorkflowResult<Vec<(i32, i32, Option<String>)>> {
        for receipt in receipts {
            if !self.items.iter().any(|i| i.line.part_number == receipt.part_number) {
                return Err(WorkflowError::not_found("transfer item", receipt.part_number.clone()));
            }
        }
        validation::ensure_unique_parts(receipts.iter().map(|r| r.part_number.as_str()))?;

        let mut plan = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let sent = item.sent_qty;
            let receipt = receipts.iter().find(|r| r.part_number == item.line.part_number);
            let (received, damaged, remarks) = match receipt {
                None => (sent, 0, None),
                Some(r) => {
                    let damaged = r.damaged_qty.unwrap_or(0);
                    let received = r.received_qty.unwrap_or(sent - damaged);
                    (received, damaged, r.remarks.clone())
                }
            };
            validation::validate_non_negative_qty("received_qty", received)?;
            validation::validate_non_negative_qty("damaged_qty", damaged)?;
            if received + damaged > sent {
                return Err(WorkflowError::ExceedsSentQuantity {
                    part_number: item.line.part_number.clone(),
                    requested: received + damaged,
                    max: sent,
                });
            }
            plan.push((received, damaged, remarks));
        }
        Ok(plan)
    }

    /// Receive at the destination. The destination must already stock the
    /// part; damaged units are not added.
    pub fn receive<L: StockLedger + ?Sized>(
        &mut self,
        receipts: &[ItemReceipt],
        remarks: Option<String>,
        ledger: &mut L,
        received_by: Option<Uuid>,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Receive)?;
        let plan = self.plan_receipt(receipts)?;

        let mut targets = Vec::with_capacity(self.items.len());
        for (item, (received, _, _)) in self.items.iter().zip(&plan) {
            if *received > 0 {
                targets.push(Some(ledger.resolve(&self.destination_ref(item))?.id));
            } else {
                targets.push(None);
            }
        }

        let reason = MovementReason::new(Self::KIND, self.transfer_no.clone(), Action::Receive);
        for ((item, (received, damaged, item_remarks)), target) in self.items.iter_mut().zip(plan).zip(targets) {
            if let Some(stock_id) = target {
                ledger.adjust(stock_id, received, &reason)?;
            }
            item.received_qty = received;
            item.damaged_qty = damaged;
            item.status = if damaged > 0 {
                TransferItemStatus::Damaged
            } else if received < item.line.quantity {
                TransferItemStatus::Partial
            } else {
                TransferItemStatus::Received
            };
            if let Some(text) = item_remarks {
                append_note(&mut item.line.remarks, text);
            }
        }

        let now = Utc::now();
        self.destination_stock_added = true;
        self.status = StockTransferStatus::Received;
        self.received_by = received_by;
        self.received_at = Some(now);
        self.actual_delivery_date = self.actual_delivery_date.or(Some(now));
        self.receiver_remarks = remarks;
        self.updated_at = now;
        Ok(())
    }

    /// Cancel before receipt; dispatched units go back to the source
    pub fn cancel<L: StockLedger + ?Sized>(&mut self, reason: Option<String>, ledger: &mut L) -> WorkflowResult<()> {
        self.ensure_can(Action::Cancel)?;
        if self.source_stock_deducted {
            let mut plan = Vec::with_capacity(self.items.len());
            for item in &self.items {
                if item.sent_qty > 0 {
                    plan.push((self.source_stock(&*ledger, item)?.id, item.sent_qty));
                }
            }
            let movement = MovementReason::new(Self::KIND, self.transfer_no.clone(), Action::Cancel);
            for (stock_id, quantity) in plan {
                ledger.adjust(stock_id, Self::DIRECTION.reversed().delta(quantity), &movement)?;
            }
            self.source_stock_deducted = false;
        }

        let now = Utc::now();
        self.status = StockTransferStatus::Cancelled;
        self.cancelled_at = Some(now);
        if let Some(reason) = reason {
            append_note(&mut self.notes, format!("Cancelled: {}", reason));
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> WorkflowResult<()> {
        self.ensure_can(Action::Delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn transfer() -> StockTransfer {
        StockTransfer::new(
            "TRF24050001".to_string(),
            NewStockTransfer {
                from_workshop: "main".to_string(),
                to_workshop: "branch".to_string(),
                transfer_date: None,
                items: vec![LineItem::new("A", "Part A", 5, Decimal::TEN)],
                transfer_reason: Some(TransferReason::StockBalancing),
                notes: None,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_same_workshop_rejected() {
        let result = StockTransfer::new(
            "TRF1".to_string(),
            NewStockTransfer {
                from_workshop: "main".to_string(),
                to_workshop: "main".to_string(),
                transfer_date: None,
                items: vec![],
                transfer_reason: None,
                notes: None,
            },
            None,
        );
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn test_refs_cover_both_workshops() {
        let doc = transfer();
        let refs = doc.stock_refs("ignored");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].workshop, "main");
        assert_eq!(refs[1].workshop, "branch");
    }

    #[test]
    fn test_receipt_plan_bounds() {
        let mut doc = transfer();
        doc.items[0].sent_qty = 5;
        let plan = doc.plan_receipt(&[]).unwrap();
        assert_eq!(plan[0].0, 5);

        let receipt = ItemReceipt {
            part_number: "A".to_string(),
            received_qty: None,
            damaged_qty: Some(2),
            remarks: None,
        };
        let plan = doc.plan_receipt(std::slice::from_ref(&receipt)).unwrap();
        assert_eq!((plan[0].0, plan[0].1), (3, 2));

        let over = ItemReceipt {
            received_qty: Some(5),
            ..receipt
        };
        assert!(matches!(
            doc.plan_receipt(&[over]),
            Err(WorkflowError::ExceedsSentQuantity { max: 5, .. })
        ));
    }

    #[test]
    fn test_cannot_dispatch_unapproved() {
        let mut doc = transfer();
        let mut ledger = crate::ledger::InMemoryLedger::new("main");
        assert!(doc.dispatch(&mut ledger, DispatchDetails::default(), None).is_err());
    }
}
