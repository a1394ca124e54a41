//! Purchase return models
//!
//! Goods sent back to a vendor. Approval deducts stock; the refund is
//! tracked by its own small status alongside the main one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{ensure_available, MovementReason, StockDemand, StockLedger, StockRef};
use crate::models::{LineItem, PurchaseOrder, StockInward, StockInwardStatus};
use crate::totals::{compute_totals, DocumentTotals};
use crate::types::{append_note, DocumentKind, VendorContact};
use crate::validation;
use crate::workflow::{Action, QuantityFlow, StatusMachine, StockDirection, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseReturnStatus {
    Draft,
    PendingApproval,
    Approved,
    Shipped,
    Delivered,
    RefundPending,
    RefundReceived,
    Closed,
    Cancelled,
}

impl PurchaseReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::RefundPending => "refund_pending",
            Self::RefundReceived => "refund_received",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PurchaseReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Draft => "Draft",
            Self::PendingApproval => "Pending Approval",
            Self::Approved => "Approved",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::RefundPending => "Refund Pending",
            Self::RefundReceived => "Refund Received",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    NotApplicable,
    #[default]
    Pending,
    Partial,
    Completed,
}

impl RefundStatus {
    /// Refund state once `refunded` of `expected` has come back
    pub fn for_amounts(refunded: Decimal, expected: Decimal) -> Self {
        if refunded >= expected && refunded > Decimal::ZERO {
            RefundStatus::Completed
        } else if refunded > Decimal::ZERO {
            RefundStatus::Partial
        } else {
            RefundStatus::Pending
        }
    }

    pub fn accepts_refunds(self) -> bool {
        matches!(self, RefundStatus::Pending | RefundStatus::Partial)
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::NotApplicable => write!(f, "Not Applicable"),
            RefundStatus::Pending => write!(f, "Pending"),
            RefundStatus::Partial => write!(f, "Partial"),
            RefundStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    Defective,
    Damaged,
    WrongItem,
    Expired,
    QualityIssue,
    ExcessStock,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    #[default]
    Unopened,
    Opened,
    Used,
    Damaged,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentMethod {
    Courier,
    HandDelivery,
    Pickup,
    Transport,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    CreditNote,
    BankTransfer,
    Cash,
    Adjustment,
}

/// A returned part; `line.quantity` is the returned quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnItem {
    #[serde(flatten)]
    pub line: LineItem,
    pub reason: ReturnReason,
    pub reason_details: Option<String>,
    #[serde(default)]
    pub condition: ItemCondition,
}

/// Part and quantity to return from a linked order or inward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLine {
    pub part_number: String,
    pub quantity: i32,
    pub reason: ReturnReason,
    pub reason_details: Option<String>,
    #[serde(default)]
    pub condition: ItemCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ShipmentDetails {
    pub method: Option<ShipmentMethod>,
    pub tracking_no: Option<String>,
    pub courier_name: Option<String>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    pub notes: Option<String>,
}

/// Fields to patch on a shipment already under way; `None` keeps the current value
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShipmentPatch {
    pub method: Option<ShipmentMethod>,
    pub tracking_no: Option<String>,
    pub courier_name: Option<String>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub shipping_cost: Option<Decimal>,
    pub notes: Option<String>,
}

impl ShipmentDetails {
    fn apply(&mut self, patch: ShipmentPatch) {
        if patch.method.is_some() {
            self.method = patch.method;
        }
        if patch.tracking_no.is_some() {
            self.tracking_no = patch.tracking_no;
        }
        if patch.courier_name.is_some() {
            self.courier_name = patch.courier_name;
        }
        if patch.shipped_date.is_some() {
            self.shipped_date = patch.shipped_date;
        }
        if patch.expected_delivery_date.is_some() {
            self.expected_delivery_date = patch.expected_delivery_date;
        }
        if patch.delivered_date.is_some() {
            self.delivered_date = patch.delivered_date;
        }
        if let Some(cost) = patch.shipping_cost {
            self.shipping_cost = cost;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundInput {
    pub amount: Decimal,
    pub method: Option<RefundMethod>,
    pub reference: Option<String>,
    pub refund_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReturn {
    pub id: Uuid,
    pub return_no: String,
    pub returned_date: DateTime<Utc>,
    pub purchase_order_id: Option<Uuid>,
    pub order_no: Option<String>,
    pub stock_inward_id: Option<Uuid>,
    pub inward_no: Option<String>,
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_contact: VendorContact,
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub items: Vec<ReturnItem>,
    pub totals: DocumentTotals,
    #[serde(default)]
    pub shipment: ShipmentDetails,
    pub status: PurchaseReturnStatus,
    pub refund_status: RefundStatus,
    pub refund_amount: Decimal,
    pub refund_date: Option<DateTime<Utc>>,
    pub refund_method: Option<RefundMethod>,
    pub refund_reference: Option<String>,
    pub stock_deducted: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseReturn {
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_contact: VendorContact,
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub returned_date: Option<DateTime<Utc>>,
    pub items: Vec<ReturnItem>,
    pub notes: Option<String>,
}

impl StatusMachine for PurchaseReturn {
    type Status = PurchaseReturnStatus;
    const KIND: DocumentKind = DocumentKind::PurchaseReturn;
    const TRANSITIONS: &'static [Transition<PurchaseReturnStatus>] = &[
        Transition {
            action: Action::Update,
            from: &[PurchaseReturnStatus::Draft, PurchaseReturnStatus::PendingApproval],
        },
        Transition {
            action: Action::Submit,
            from: &[PurchaseReturnStatus::Draft],
        },
        Transition {
            action: Action::Approve,
            from: &[PurchaseReturnStatus::PendingApproval],
        },
        Transition {
            action: Action::Ship,
            from: &[PurchaseReturnStatus::Approved],
        },
        Transition {
            action: Action::UpdateShipment,
            from: &[PurchaseReturnStatus::Shipped, PurchaseReturnStatus::Delivered],
        },
        Transition {
            action: Action::Deliver,
            from: &[PurchaseReturnStatus::Shipped],
        },
        Transition {
            action: Action::Refund,
            from: &[PurchaseReturnStatus::Delivered, PurchaseReturnStatus::RefundPending],
        },
        Transition {
            action: Action::WaiveRefund,
            from: &[
                PurchaseReturnStatus::Approved,
                PurchaseReturnStatus::Shipped,
                PurchaseReturnStatus::Delivered,
            ],
        },
        Transition {
            action: Action::Close,
            from: &[
                PurchaseReturnStatus::Delivered,
                PurchaseReturnStatus::RefundPending,
                PurchaseReturnStatus::RefundReceived,
            ],
        },
        Transition {
            action: Action::Cancel,
            from: &[
                PurchaseReturnStatus::Draft,
                PurchaseReturnStatus::PendingApproval,
                PurchaseReturnStatus::Approved,
            ],
        },
        Transition {
            action: Action::Delete,
            from: &[PurchaseReturnStatus::Draft],
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.return_no
    }

    fn status(&self) -> PurchaseReturnStatus {
        self.status
    }
}

impl QuantityFlow for PurchaseReturn {
    const DIRECTION: StockDirection = StockDirection::Outbound;

    fn stock_refs(&self, home_workshop: &str) -> Vec<StockRef> {
        self.items.iter().map(|i| i.line.stock_ref(home_workshop)).collect()
    }
}

fn validate_items(items: &[ReturnItem]) -> WorkflowResult<()> {
    validation::validate_lines(items.iter().map(|i| &i.line))?;
    validation::ensure_unique_parts(items.iter().map(|i| i.line.part_number.as_str()))
}

/// Quantity per part that may still go back to the vendor against one
/// linked order or inward, net of the other live returns on that source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnAllowance {
    remaining: HashMap<String, i32>,
}

impl ReturnAllowance {
    fn net_of<'a>(
        held: impl IntoIterator<Item = (&'a str, i32)>,
        others: &[PurchaseReturn],
        excluding: Option<Uuid>,
    ) -> Self {
        let mut remaining: HashMap<String, i32> = HashMap::new();
        for (part, quantity) in held {
            *remaining.entry(part.to_string()).or_default() += quantity;
        }
        for other in others {
            if other.status == PurchaseReturnStatus::Cancelled || Some(other.id) == excluding {
                continue;
            }
            for item in &other.items {
                if let Some(left) = remaining.get_mut(&item.line.part_number) {
                    *left = left.saturating_sub(item.line.quantity);
                }
            }
        }
        Self { remaining }
    }

    /// Parts inwarded against `order`, less what `others` already return
    pub fn for_purchase_order(order: &PurchaseOrder, others: &[PurchaseReturn], excluding: Option<Uuid>) -> Self {
        Self::net_of(
            order
                .ordered_parts
                .iter()
                .map(|l| (l.part_number.as_str(), order.inwarded_qty(&l.part_number))),
            others,
            excluding,
        )
    }

    /// Parts received on `inward`, less what `others` already return
    pub fn for_stock_inward(inward: &StockInward, others: &[PurchaseReturn], excluding: Option<Uuid>) -> Self {
        Self::net_of(
            inward.items.iter().map(|l| (l.part_number.as_str(), l.quantity)),
            others,
            excluding,
        )
    }

    pub fn remaining(&self, part_number: &str) -> i32 {
        self.remaining.get(part_number).copied().unwrap_or(0).max(0)
    }

    fn check(&self, part_number: &str, requested: i32) -> WorkflowResult<()> {
        let max = self.remaining(part_number);
        if requested > max {
            return Err(WorkflowError::ExceedsIssuedQuantity {
                part_number: part_number.to_string(),
                requested,
                max,
            });
        }
        Ok(())
    }
}

/// Build return items from source lines, bounded by the allowance
fn items_from_source(
    lines: &[ReturnLine],
    source: &[LineItem],
    allowance: &ReturnAllowance,
) -> WorkflowResult<Vec<ReturnItem>> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let origin = source
            .iter()
            .find(|l| l.part_number == line.part_number)
            .ok_or_else(|| WorkflowError::not_found("source line", line.part_number.clone()))?;
        allowance.check(&line.part_number, line.quantity)?;
        items.push(ReturnItem {
            line: LineItem {
                quantity: line.quantity,
                remarks: None,
                ..origin.clone()
            },
            reason: line.reason,
            reason_details: line.reason_details.clone(),
            condition: line.condition,
        });
    }
    Ok(items)
}

impl PurchaseReturn {
    pub fn new(return_no: String, input: NewPurchaseReturn, created_by: Option<Uuid>) -> WorkflowResult<Self> {
        validation::validate_required("vendor_name", &input.vendor_name)?;
        validate_items(&input.items)?;

        let now = Utc::now();
        let mut doc = Self {
            id: Uuid::new_v4(),
            return_no,
            returned_date: input.returned_date.unwrap_or(now),
            purchase_order_id: None,
            order_no: None,
            stock_inward_id: None,
            inward_no: None,
            vendor_name: input.vendor_name.trim().to_string(),
            vendor_contact: input.vendor_contact,
            job_card_no: input.job_card_no,
            reg_no: input.reg_no,
            items: input.items,
            totals: DocumentTotals::default(),
            shipment: ShipmentDetails::default(),
            status: PurchaseReturnStatus::Draft,
            refund_status: RefundStatus::Pending,
            refund_amount: Decimal::ZERO,
            refund_date: None,
            refund_method: None,
            refund_reference: None,
            stock_deducted: false,
            approved_by: None,
            approved_at: None,
            cancelled_at: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        doc.recalculate();
        Ok(doc)
    }

    /// Return parts inwarded against a purchase order
    pub fn from_purchase_order(
        return_no: String,
        order: &PurchaseOrder,
        others: &[PurchaseReturn],
        lines: &[ReturnLine],
        created_by: Option<Uuid>,
    ) -> WorkflowResult<Self> {
        let allowance = ReturnAllowance::for_purchase_order(order, others, None);
        let items = items_from_source(lines, &order.ordered_parts, &allowance)?;
        let mut doc = Self::new(
            return_no,
            NewPurchaseReturn {
                vendor_name: order.vendor_name.clone(),
                vendor_contact: order.vendor_contact.clone(),
                job_card_no: order.job_card_no.clone(),
                reg_no: order.reg_no.clone(),
                returned_date: None,
                items,
                notes: None,
            },
            created_by,
        )?;
        doc.purchase_order_id = Some(order.id);
        doc.order_no = Some(order.order_no.clone());
        Ok(doc)
    }

    /// Return parts received on a verified stock inward
    pub fn from_stock_inward(
        return_no: String,
        inward: &StockInward,
        others: &[PurchaseReturn],
        lines: &[ReturnLine],
        created_by: Option<Uuid>,
    ) -> WorkflowResult<Self> {
        if inward.status != StockInwardStatus::Verified {
            return Err(WorkflowError::validation(
                "stock_inward_id",
                format!("{} has not been verified", inward.inward_no),
            ));
        }
        let allowance = ReturnAllowance::for_stock_inward(inward, others, None);
        let items = items_from_source(lines, &inward.items, &allowance)?;
        let mut doc = Self::new(
            return_no,
            NewPurchaseReturn {
                vendor_name: inward.vendor_name.clone(),
                vendor_contact: VendorContact::default(),
                job_card_no: inward.job_card_no.clone(),
                reg_no: inward.reg_no.clone(),
                returned_date: None,
                items,
                notes: None,
            },
            created_by,
        )?;
        doc.stock_inward_id = Some(inward.id);
        doc.inward_no = Some(inward.inward_no.clone());
        doc.purchase_order_id = inward.purchase_order_id;
        doc.order_no = inward.order_no.clone();
        Ok(doc)
    }

    pub fn recalculate(&mut self) {
        self.totals = compute_totals(self.items.iter_mut().map(|i| &mut i.line), None, &[]);
    }

    /// Value the vendor owes back
    pub fn total_return_value(&self) -> Decimal {
        self.totals.total_amount
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether the return was drafted against an order or inward
    pub fn is_linked(&self) -> bool {
        self.purchase_order_id.is_some() || self.stock_inward_id.is_some()
    }

    /// Replace the items; a linked return must pass the allowance of its source
    pub fn update_items(
        &mut self,
        items: Vec<ReturnItem>,
        allowance: Option<&ReturnAllowance>,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        validate_items(&items)?;
        match allowance {
            Some(allowance) => {
                for item in &items {
                    allowance.check(&item.line.part_number, item.line.quantity)?;
                }
            }
            None if self.is_linked() => {
                return Err(WorkflowError::validation(
                    "items",
                    format!("{} is linked to a source; its allowance is required", self.return_no),
                ));
            }
            None => {}
        }
        self.items = items;
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn submit_for_approval(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::Submit)?;
        if self.items.is_empty() {
            return Err(WorkflowError::EmptyDocument { kind: Self::KIND });
        }
        self.status = PurchaseReturnStatus::PendingApproval;
        self.touch();
        Ok(())
    }

    /// Approve and take the returned parts out of stock, all or nothing
    pub fn approve<L: StockLedger + ?Sized>(&mut self, ledger: &mut L, approved_by: Option<Uuid>) -> WorkflowResult<()> {
        self.ensure_can(Action::Approve)?;
        let home = ledger.home_workshop().to_string();

        let mut demands = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let stock = ledger.resolve(&item.line.stock_ref(&home))?;
            demands.push(StockDemand {
                stock_id: stock.id,
                part_number: item.line.part_number.clone(),
                quantity: item.line.quantity,
            });
        }
        ensure_available(&*ledger, &demands)?;

        let reason = MovementReason::new(Self::KIND, self.return_no.clone(), Action::Approve);
        for (item, demand) in self.items.iter_mut().zip(&demands) {
            ledger.adjust(demand.stock_id, Self::DIRECTION.delta(demand.quantity), &reason)?;
            item.line.stock_id = Some(demand.stock_id);
        }

        let now = Utc::now();
        self.stock_deducted = true;
        self.status = PurchaseReturnStatus::Approved;
        self.approved_by = approved_by;
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_shipped(&mut self, shipment: ShipmentDetails) -> WorkflowResult<()> {
        self.ensure_can(Action::Ship)?;
        self.shipment = ShipmentDetails {
            shipped_date: shipment.shipped_date.or_else(|| Some(Utc::now())),
            ..shipment
        };
        self.status = PurchaseReturnStatus::Shipped;
        self.touch();
        Ok(())
    }

    /// Correct tracking or courier details after shipping; status is untouched
    pub fn update_shipment(&mut self, patch: ShipmentPatch) -> WorkflowResult<()> {
        self.ensure_can(Action::UpdateShipment)?;
        if let Some(cost) = patch.shipping_cost {
            if cost < Decimal::ZERO {
                return Err(WorkflowError::validation("shipping_cost", "must not be negative"));
            }
        }
        self.shipment.apply(patch);
        self.touch();
        Ok(())
    }

    pub fn mark_delivered(&mut self, delivered_date: Option<DateTime<Utc>>) -> WorkflowResult<()> {
        self.ensure_can(Action::Deliver)?;
        self.shipment.delivered_date = delivered_date.or_else(|| Some(Utc::now()));
        self.status = PurchaseReturnStatus::Delivered;
        if self.refund_status != RefundStatus::NotApplicable {
            self.refund_status = RefundStatus::for_amounts(self.refund_amount, self.total_return_value());
        }
        self.touch();
        Ok(())
    }

    /// Record money received back from the vendor
    pub fn record_refund(&mut self, refund: RefundInput) -> WorkflowResult<()> {
        self.ensure_can(Action::Refund)?;
        validation::validate_positive_amount("refund_amount", refund.amount)?;
        if !self.refund_status.accepts_refunds() {
            return Err(WorkflowError::InvalidTransition {
                kind: Self::KIND,
                document_no: self.return_no.clone(),
                from: format!("{} with refund {}", self.status, self.refund_status),
                action: Action::Refund,
            });
        }

        self.refund_amount += refund.amount;
        self.refund_status = RefundStatus::for_amounts(self.refund_amount, self.total_return_value());
        self.status = match self.refund_status {
            RefundStatus::Completed => PurchaseReturnStatus::RefundReceived,
            _ => PurchaseReturnStatus::RefundPending,
        };
        self.refund_date = refund.refund_date.or_else(|| Some(Utc::now()));
        if refund.method.is_some() {
            self.refund_method = refund.method;
        }
        if refund.reference.is_some() {
            self.refund_reference = refund.reference;
        }
        self.touch();
        Ok(())
    }

    /// Mark that no refund is expected (e.g. replacement goods instead)
    pub fn waive_refund(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::WaiveRefund)?;
        if self.refund_status != RefundStatus::Pending {
            return Err(WorkflowError::InvalidTransition {
                kind: Self::KIND,
                document_no: self.return_no.clone(),
                from: format!("refund {}", self.refund_status),
                action: Action::WaiveRefund,
            });
        }
        self.refund_status = RefundStatus::NotApplicable;
        self.touch();
        Ok(())
    }

    pub fn close(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::Close)?;
        self.status = PurchaseReturnStatus::Closed;
        self.touch();
        Ok(())
    }

    /// Cancel before shipment, putting approved quantities back
    pub fn cancel<L: StockLedger + ?Sized>(&mut self, reason: Option<String>, ledger: &mut L) -> WorkflowResult<()> {
        self.ensure_can(Action::Cancel)?;
        if self.stock_deducted {
            let home = ledger.home_workshop().to_string();
            let mut plan = Vec::with_capacity(self.items.len());
            for item in &self.items {
                plan.push((ledger.resolve(&item.line.stock_ref(&home))?.id, item.line.quantity));
            }
            let movement = MovementReason::new(Self::KIND, self.return_no.clone(), Action::Cancel);
            for (stock_id, quantity) in plan {
                ledger.adjust(stock_id, Self::DIRECTION.reversed().delta(quantity), &movement)?;
            }
            self.stock_deducted = false;
        }

        let now = Utc::now();
        self.status = PurchaseReturnStatus::Cancelled;
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
mod property_tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::models::{NewPurchaseOrder, PartQuantity};
    use proptest::prelude::*;

    fn received_order(ordered: i32, inwarded: i32) -> PurchaseOrder {
        let mut order = PurchaseOrder::new(
            "PO24050001".to_string(),
            NewPurchaseOrder {
                vendor_name: "Acme Parts".to_string(),
                vendor_contact: VendorContact::default(),
                job_card_no: None,
                reg_no: None,
                order_date: None,
                ordered_parts: vec![LineItem::new("A", "Part A", ordered, Decimal::from(50))],
                notes: None,
            },
            None,
        )
        .unwrap();
        order.submit().unwrap();
        if inwarded > 0 {
            let mut ledger = InMemoryLedger::new("main");
            order
                .inward_parts(&[PartQuantity::new("A", inwarded)], false, &mut ledger)
                .unwrap();
        }
        order
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Live returns drafted one after another never add up past what
        /// the order received; cancelled ones give their quantity back
        #[test]
        fn prop_returns_stay_within_received(
            ordered in 1i32..40,
            received_share in 0i32..=100,
            attempts in prop::collection::vec((1i32..15, any::<bool>()), 1..10)
        ) {
            let inwarded = ordered * received_share / 100;
            let order = received_order(ordered, inwarded);
            let mut returns: Vec<PurchaseReturn> = Vec::new();

            for (n, (qty, cancel)) in attempts.into_iter().enumerate() {
                let remaining = ReturnAllowance::for_purchase_order(&order, &returns, None).remaining("A");
                let line = ReturnLine {
                    part_number: "A".to_string(),
                    quantity: qty,
                    reason: ReturnReason::Defective,
                    reason_details: None,
                    condition: ItemCondition::Unopened,
                };
                match PurchaseReturn::from_purchase_order(format!("PR{}", n), &order, &returns, &[line], None) {
                    Ok(mut doc) => {
                        prop_assert!(qty <= remaining);
                        if cancel {
                            doc.cancel(None, &mut InMemoryLedger::new("main")).unwrap();
                        }
                        returns.push(doc);
                    }
                    Err(_) => prop_assert!(qty > remaining),
                }

                let live: i32 = returns
                    .iter()
                    .filter(|r| r.status != PurchaseReturnStatus::Cancelled)
                    .map(|r| r.items[0].line.quantity)
                    .sum();
                prop_assert!(live <= inwarded);
                prop_assert_eq!(
                    ReturnAllowance::for_purchase_order(&order, &returns, None).remaining("A"),
                    inwarded - live
                );
            }
        }
    }
}
