//! Purchase order models
//!
//! A purchase order tracks ordered, inwarded and rejected quantities per
//! part. Its receiving status is derived from those quantities rather than
//! set directly; only cancel and close are explicit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{MovementReason, StockLedger, StockRef};
use crate::models::{LineItem, PartQuantity};
use crate::totals::{compute_totals, DocumentTotals, Payment};
use crate::types::{append_note, DocumentKind, VendorContact};
use crate::validation;
use crate::workflow::{Action, QuantityFlow, StatusMachine, StockDirection, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    PartiallyReceived,
    Received,
    Cancelled,
    Closed,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::PartiallyReceived => "partially_received",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Pending => write!(f, "Pending"),
            Self::PartiallyReceived => write!(f, "Partially Received"),
            Self::Received => write!(f, "Received"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Units inwarded or rejected against one ordered part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptEntry {
    pub stock_id: Option<Uuid>,
    pub part_number: String,
    pub part_name: String,
    pub quantity: i32,
    /// Remarks for inwards, reason for rejections
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Units of a part still outstanding on the order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingPart {
    pub stock_id: Option<Uuid>,
    pub part_number: String,
    pub part_name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_no: String,
    pub order_date: DateTime<Utc>,
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_contact: VendorContact,
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub ordered_parts: Vec<LineItem>,
    #[serde(default)]
    pub inwarded_parts: Vec<ReceiptEntry>,
    #[serde(default)]
    pub rejected_parts: Vec<ReceiptEntry>,
    #[serde(default)]
    pub pending_parts: Vec<PendingPart>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub totals: DocumentTotals,
    pub status: PurchaseOrderStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_contact: VendorContact,
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub ordered_parts: Vec<LineItem>,
    pub notes: Option<String>,
}

impl StatusMachine for PurchaseOrder {
    type Status = PurchaseOrderStatus;
    const KIND: DocumentKind = DocumentKind::PurchaseOrder;
    const TRANSITIONS: &'static [Transition<PurchaseOrderStatus>] = &[
        Transition {
            action: Action::Update,
            from: &[PurchaseOrderStatus::Draft, PurchaseOrderStatus::Pending],
        },
        Transition {
            action: Action::Submit,
            from: &[PurchaseOrderStatus::Draft],
        },
        Transition {
            action: Action::Inward,
            from: &[PurchaseOrderStatus::Pending, PurchaseOrderStatus::PartiallyReceived],
        },
        Transition {
            action: Action::Reject,
            from: &[PurchaseOrderStatus::Pending, PurchaseOrderStatus::PartiallyReceived],
        },
        Transition {
            action: Action::Pay,
            from: &[
                PurchaseOrderStatus::Pending,
                PurchaseOrderStatus::PartiallyReceived,
                PurchaseOrderStatus::Received,
                PurchaseOrderStatus::Closed,
            ],
        },
        Transition {
            action: Action::Close,
            from: &[PurchaseOrderStatus::PartiallyReceived, PurchaseOrderStatus::Received],
        },
        Transition {
            action: Action::Cancel,
            from: &[
                PurchaseOrderStatus::Draft,
                PurchaseOrderStatus::Pending,
                PurchaseOrderStatus::PartiallyReceived,
            ],
        },
        Transition {
            action: Action::Delete,
            from: &[PurchaseOrderStatus::Draft],
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.order_no
    }

    fn status(&self) -> PurchaseOrderStatus {
        self.status
    }
}

impl QuantityFlow for PurchaseOrder {
    const DIRECTION: StockDirection = StockDirection::Inbound;

    fn stock_refs(&self, home_workshop: &str) -> Vec<StockRef> {
        self.ordered_parts.iter().map(|p| p.stock_ref(home_workshop)).collect()
    }
}

impl PurchaseOrder {
    pub fn new(order_no: String, input: NewPurchaseOrder, created_by: Option<Uuid>) -> WorkflowResult<Self> {
        validation::validate_required("vendor_name", &input.vendor_name)?;
        validation::validate_lines(&input.ordered_parts)?;
        if input.ordered_parts.is_empty() {
            return Err(WorkflowError::EmptyDocument {
                kind: DocumentKind::PurchaseOrder,
            });
        }

        let now = Utc::now();
        let mut order = Self {
            id: Uuid::new_v4(),
            order_no,
            order_date: input.order_date.unwrap_or(now),
            vendor_name: input.vendor_name.trim().to_string(),
            vendor_contact: input.vendor_contact,
            job_card_no: input.job_card_no,
            reg_no: input.reg_no,
            ordered_parts: Vec::new(),
            inwarded_parts: Vec::new(),
            rejected_parts: Vec::new(),
            pending_parts: Vec::new(),
            payments: Vec::new(),
            totals: DocumentTotals::default(),
            status: PurchaseOrderStatus::Draft,
            submitted_at: None,
            closed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        for line in input.ordered_parts {
            order.merge_ordered_part(line);
        }
        order.recalculate();
        Ok(order)
    }

    /// Re-derive totals, pending parts and the receiving status
    pub fn recalculate(&mut self) {
        self.totals = compute_totals(self.ordered_parts.iter_mut(), None, &self.payments);
        self.pending_parts = self
            .ordered_parts
            .iter()
            .filter_map(|line| {
                let outstanding = self.outstanding_qty(&line.part_number);
                (outstanding > 0).then(|| PendingPart {
                    stock_id: line.stock_id,
                    part_number: line.part_number.clone(),
                    part_name: line.part_name.clone(),
                    quantity: outstanding,
                })
            })
            .collect();
        self.status = self.derive_status();
    }

    fn derive_status(&self) -> PurchaseOrderStatus {
        if self.cancelled_at.is_some() {
            return PurchaseOrderStatus::Cancelled;
        }
        if self.closed_at.is_some() {
            return PurchaseOrderStatus::Closed;
        }
        if self.submitted_at.is_none() {
            return PurchaseOrderStatus::Draft;
        }
        let ordered: i32 = self.ordered_parts.iter().map(|p| p.quantity).sum();
        let accounted = sum_qty(&self.inwarded_parts) + sum_qty(&self.rejected_parts);
        if accounted == 0 {
            PurchaseOrderStatus::Pending
        } else if accounted >= ordered {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::PartiallyReceived
        }
    }

    pub fn order_value(&self) -> Decimal {
        self.totals.subtotal
    }

    pub fn grand_total(&self) -> Decimal {
        self.totals.total_amount
    }

    pub fn ordered_qty(&self, part_number: &str) -> i32 {
        self.ordered_parts
            .iter()
            .filter(|p| p.part_number == part_number)
            .map(|p| p.quantity)
            .sum()
    }

    pub fn inwarded_qty(&self, part_number: &str) -> i32 {
        part_qty(&self.inwarded_parts, part_number)
    }

    pub fn rejected_qty(&self, part_number: &str) -> i32 {
        part_qty(&self.rejected_parts, part_number)
    }

    /// Ordered minus inwarded minus rejected
    pub fn outstanding_qty(&self, part_number: &str) -> i32 {
        self.ordered_qty(part_number) - self.inwarded_qty(part_number) - self.rejected_qty(part_number)
    }

    fn has_receipts(&self) -> bool {
        !self.inwarded_parts.is_empty() || !self.rejected_parts.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn merge_ordered_part(&mut self, line: LineItem) {
        match self
            .ordered_parts
            .iter_mut()
            .find(|p| p.part_number == line.part_number)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => self.ordered_parts.push(line),
        }
    }

    pub fn submit(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::Submit)?;
        self.submitted_at = Some(Utc::now());
        self.recalculate();
        self.touch();
        Ok(())
    }

    fn ensure_editable(&self) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        if self.has_receipts() {
            return Err(WorkflowError::InvalidTransition {
                kind: DocumentKind::PurchaseOrder,
                document_no: self.order_no.clone(),
                from: format!("{} with receipts recorded", self.status),
                action: Action::Update,
            });
        }
        Ok(())
    }

    /// Add a part; an already-ordered part has its quantity increased
    pub fn add_ordered_part(&mut self, line: LineItem) -> WorkflowResult<()> {
        self.ensure_editable()?;
        validation::validate_line(&line)?;
        self.merge_ordered_part(line);
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn remove_ordered_part(&mut self, part_number: &str) -> WorkflowResult<LineItem> {
        self.ensure_editable()?;
        let index = self
            .ordered_parts
            .iter()
            .position(|p| p.part_number == part_number)
            .ok_or_else(|| WorkflowError::not_found("ordered part", part_number))?;
        if self.ordered_parts.len() == 1 {
            return Err(WorkflowError::EmptyDocument {
                kind: DocumentKind::PurchaseOrder,
            });
        }
        let removed = self.ordered_parts.remove(index);
        self.recalculate();
        self.touch();
        Ok(removed)
    }

    /// Check a batch of receipt quantities against what is outstanding.
    /// Repeated parts in one batch count together.
    fn plan_receipts(&self, parts: &[PartQuantity]) -> WorkflowResult<Vec<ReceiptEntry>> {
        let now = Utc::now();
        let mut in_batch: HashMap<&str, i32> = HashMap::new();
        let mut entries = Vec::with_capacity(parts.len());
        for part in parts {
            validation::validate_quantity("quantity", part.quantity)?;
            let ordered = self
                .ordered_parts
                .iter()
                .find(|p| p.part_number == part.part_number)
                .ok_or_else(|| WorkflowError::not_found("ordered part", part.part_number.clone()))?;

            let already = in_batch.entry(part.part_number.as_str()).or_insert(0);
            let max = self.outstanding_qty(&part.part_number) - *already;
            if part.quantity > max {
                return Err(WorkflowError::ExceedsOrderedQuantity {
                    part_number: part.part_number.clone(),
                    requested: part.quantity,
                    max,
                });
            }
            *already += part.quantity;
            entries.push(ReceiptEntry {
                stock_id: ordered.stock_id,
                part_number: ordered.part_number.clone(),
                part_name: ordered.part_name.clone(),
                quantity: part.quantity,
                note: part.note.clone(),
                recorded_at: now,
            });
        }
        Ok(entries)
    }

    /// Record received units, optionally adding them to stock
    pub fn inward_parts<L: StockLedger + ?Sized>(
        &mut self,
        parts: &[PartQuantity],
        update_stock: bool,
        ledger: &mut L,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Inward)?;
        let mut entries = self.plan_receipts(parts)?;

        if update_stock {
            let home = ledger.home_workshop().to_string();
            let mut targets = Vec::with_capacity(entries.len());
            for entry in &entries {
                let stock_ref = StockRef {
                    stock_id: entry.stock_id,
                    workshop: home.clone(),
                    part_number: entry.part_number.clone(),
                };
                targets.push(ledger.resolve(&stock_ref)?.id);
            }
            let reason = MovementReason::new(Self::KIND, self.order_no.clone(), Action::Inward);
            for (entry, stock_id) in entries.iter_mut().zip(targets) {
                ledger.adjust(stock_id, Self::DIRECTION.delta(entry.quantity), &reason)?;
                entry.stock_id = Some(stock_id);
            }
        }

        self.inwarded_parts.extend(entries);
        self.recalculate();
        self.touch();
        Ok(())
    }

    /// Record refused units; stock is untouched
    pub fn reject_parts(&mut self, parts: &[PartQuantity]) -> WorkflowResult<()> {
        self.ensure_can(Action::Reject)?;
        let entries = self.plan_receipts(parts)?;
        self.rejected_parts.extend(entries);
        self.recalculate();
        self.touch();
        Ok(())
    }

    /// Record receipts verified through a stock inward. The inward moves
    /// the stock itself, so only the order's quantities change here.
    pub fn record_inward_receipt(&mut self, parts: &[PartQuantity]) -> WorkflowResult<()> {
        self.ensure_can(Action::Inward)?;
        let entries = self.plan_receipts(parts)?;
        self.inwarded_parts.extend(entries);
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn record_payment(&mut self, payment: Payment) -> WorkflowResult<()> {
        self.ensure_can(Action::Pay)?;
        validation::validate_positive_amount("amount", payment.amount)?;
        self.payments.push(payment);
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn close(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::Close)?;
        self.closed_at = Some(Utc::now());
        self.recalculate();
        self.touch();
        Ok(())
    }

    /// Cancel the order. Stock already inwarded stays where it is.
    pub fn cancel(&mut self, reason: Option<String>) -> WorkflowResult<()> {
        self.ensure_can(Action::Cancel)?;
        self.cancelled_at = Some(Utc::now());
        if let Some(reason) = &reason {
            append_note(&mut self.notes, format!("Cancelled: {}", reason));
        }
        self.cancel_reason = reason;
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn ensure_deletable(&self) -> WorkflowResult<()> {
        self.ensure_can(Action::Delete)
    }
}

fn sum_qty(entries: &[ReceiptEntry]) -> i32 {
    entries.iter().map(|e| e.quantity).sum()
}

fn part_qty(entries: &[ReceiptEntry], part_number: &str) -> i32 {
    entries
        .iter()
        .filter(|e| e.part_number == part_number)
        .map(|e| e.quantity)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order() -> PurchaseOrder {
        PurchaseOrder::new(
            "PO24050001".to_string(),
            NewPurchaseOrder {
                vendor_name: "Acme Parts".to_string(),
                vendor_contact: VendorContact::default(),
                job_card_no: None,
                reg_no: None,
                order_date: None,
                ordered_parts: vec![
                    LineItem::new("A", "Part A", 10, dec("5")),
                    LineItem::new("B", "Part B", 4, dec("20")),
                ],
                notes: None,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_is_draft_with_everything_pending() {
        let po = order();
        assert_eq!(po.status, PurchaseOrderStatus::Draft);
        assert_eq!(po.pending_parts.len(), 2);
        assert_eq!(po.order_value(), dec("130"));
    }

    #[test]
    fn test_inward_requires_submission() {
        let mut po = order();
        let err = po.reject_parts(&[PartQuantity::new("A", 1)]).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn test_status_follows_receipts() {
        let mut po = order();
        po.submit().unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Pending);

        po.reject_parts(&[PartQuantity::new("A", 2).with_note("cracked")]).unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);
        assert_eq!(po.outstanding_qty("A"), 8);

        po.record_inward_receipt(&[PartQuantity::new("A", 8), PartQuantity::new("B", 4)])
            .unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Received);
        assert!(po.pending_parts.is_empty());
    }

    #[test]
    fn test_batch_counts_repeated_parts_together() {
        let mut po = order();
        po.submit().unwrap();
        let err = po
            .reject_parts(&[PartQuantity::new("B", 3), PartQuantity::new("B", 2)])
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::ExceedsOrderedQuantity {
                part_number: "B".to_string(),
                requested: 2,
                max: 1,
            }
        );
        assert!(po.rejected_parts.is_empty());
    }

    #[test]
    fn test_add_part_merges_and_locks_after_receipts() {
        let mut po = order();
        po.add_ordered_part(LineItem::new("A", "Part A", 5, dec("5"))).unwrap();
        assert_eq!(po.ordered_qty("A"), 15);
        assert_eq!(po.ordered_parts.len(), 2);

        po.submit().unwrap();
        po.record_inward_receipt(&[PartQuantity::new("B", 1)]).unwrap();
        assert!(po.add_ordered_part(LineItem::new("C", "Part C", 1, dec("1"))).is_err());
        assert!(po.remove_ordered_part("A").is_err());
    }

    #[test]
    fn test_close_and_cancel_rules() {
        let mut po = order();
        assert!(po.close().is_err());
        po.submit().unwrap();
        po.record_inward_receipt(&[PartQuantity::new("A", 10), PartQuantity::new("B", 4)])
            .unwrap();
        assert!(po.cancel(None).is_err());
        po.close().unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Closed);
        assert!(po.ensure_deletable().is_err());
    }

    #[test]
    fn test_payments_roll_into_totals() {
        let mut po = order();
        po.submit().unwrap();
        po.record_payment(Payment::new(dec("30"), Default::default())).unwrap();
        assert_eq!(po.totals.paid_amount, dec("30"));
        assert_eq!(po.totals.balance_amount, dec("100"));
        assert!(po
            .record_payment(Payment::new(Decimal::ZERO, Default::default()))
            .is_err());
    }
}
