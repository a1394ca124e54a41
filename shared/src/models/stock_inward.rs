//! Stock inward (goods receipt) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{MovementReason, StockLedger, StockRef};
use crate::models::{LineItem, PartQuantity, PurchaseOrder};
use crate::totals::{compute_totals, DocumentTotals};
use crate::types::{append_note, DocumentKind};
use crate::validation;
use crate::workflow::{Action, QuantityFlow, StatusMachine, StockDirection, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockInwardStatus {
    Draft,
    PendingVerification,
    Verified,
    Cancelled,
}

impl StockInwardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingVerification => "pending_verification",
            Self::Verified => "verified",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StockInwardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::PendingVerification => write!(f, "Pending Verification"),
            Self::Verified => write!(f, "Verified"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A receipt of parts. Stock only moves when it is verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInward {
    pub id: Uuid,
    pub inward_no: String,
    pub inward_date: DateTime<Utc>,
    pub purchase_order_id: Option<Uuid>,
    pub order_no: Option<String>,
    pub vendor_name: String,
    pub receipt_no: Option<String>,
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub items: Vec<LineItem>,
    pub totals: DocumentTotals,
    pub status: StockInwardStatus,
    pub is_verified: bool,
    pub stock_updated: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockInward {
    pub vendor_name: String,
    pub receipt_no: Option<String>,
    pub inward_date: Option<DateTime<Utc>>,
    pub job_card_no: Option<String>,
    pub reg_no: Option<String>,
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
}

impl StatusMachine for StockInward {
    type Status = StockInwardStatus;
    const KIND: DocumentKind = DocumentKind::StockInward;
    const TRANSITIONS: &'static [Transition<StockInwardStatus>] = &[
        Transition {
            action: Action::Update,
            from: &[StockInwardStatus::Draft],
        },
        Transition {
            action: Action::Submit,
            from: &[StockInwardStatus::Draft],
        },
        Transition {
            action: Action::Verify,
            from: &[StockInwardStatus::PendingVerification],
        },
        Transition {
            action: Action::Cancel,
            from: &[StockInwardStatus::Draft, StockInwardStatus::PendingVerification],
        },
        Transition {
            action: Action::Delete,
            from: &[StockInwardStatus::Draft],
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.inward_no
    }

    fn status(&self) -> StockInwardStatus {
        self.status
    }
}

impl QuantityFlow for StockInward {
    const DIRECTION: StockDirection = StockDirection::Inbound;

    fn stock_refs(&self, home_workshop: &str) -> Vec<StockRef> {
        self.items.iter().map(|i| i.stock_ref(home_workshop)).collect()
    }
}

impl StockInward {
    pub fn new(inward_no: String, input: NewStockInward, created_by: Option<Uuid>) -> WorkflowResult<Self> {
        validation::validate_required("vendor_name", &input.vendor_name)?;
        validation::validate_lines(&input.items)?;
        validation::ensure_unique_parts(input.items.iter().map(|i| i.part_number.as_str()))?;

        let now = Utc::now();
        let mut inward = Self {
            id: Uuid::new_v4(),
            inward_no,
            inward_date: input.inward_date.unwrap_or(now),
            purchase_order_id: None,
            order_no: None,
            vendor_name: input.vendor_name.trim().to_string(),
            receipt_no: input.receipt_no,
            job_card_no: input.job_card_no,
            reg_no: input.reg_no,
            items: input.items,
            totals: DocumentTotals::default(),
            status: StockInwardStatus::Draft,
            is_verified: false,
            stock_updated: false,
            verified_by: None,
            verified_at: None,
            cancel_reason: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        inward.recalculate();
        Ok(inward)
    }

    /// Draft inward covering everything still outstanding on the order
    pub fn from_purchase_order(
        inward_no: String,
        order: &PurchaseOrder,
        receipt_no: Option<String>,
        created_by: Option<Uuid>,
    ) -> WorkflowResult<Self> {
        order.ensure_can(Action::Inward)?;
        let items: Vec<LineItem> = order
            .pending_parts
            .iter()
            .filter_map(|pending| {
                let ordered = order
                    .ordered_parts
                    .iter()
                    .find(|p| p.part_number == pending.part_number)?;
                Some(LineItem {
                    quantity: pending.quantity,
                    ..ordered.clone()
                })
            })
            .collect();
        if items.is_empty() {
            return Err(WorkflowError::EmptyDocument {
                kind: DocumentKind::StockInward,
            });
        }

        let mut inward = Self::new(
            inward_no,
            NewStockInward {
                vendor_name: order.vendor_name.clone(),
                receipt_no,
                inward_date: None,
                job_card_no: order.job_card_no.clone(),
                reg_no: order.reg_no.clone(),
                items,
                notes: None,
            },
            created_by,
        )?;
        inward.purchase_order_id = Some(order.id);
        inward.order_no = Some(order.order_no.clone());
        Ok(inward)
    }

    pub fn recalculate(&mut self) {
        self.totals = compute_totals(self.items.iter_mut(), None, &[]);
    }

    pub fn inward_value(&self) -> rust_decimal::Decimal {
        self.totals.total_amount
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn update_items(&mut self, items: Vec<LineItem>) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        validation::validate_lines(&items)?;
        validation::ensure_unique_parts(items.iter().map(|i| i.part_number.as_str()))?;
        self.items = items;
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn submit_for_verification(&mut self) -> WorkflowResult<()> {
        self.ensure_can(Action::Submit)?;
        if self.items.is_empty() {
            return Err(WorkflowError::EmptyDocument { kind: Self::KIND });
        }
        self.status = StockInwardStatus::PendingVerification;
        self.touch();
        Ok(())
    }

    /// Verify the receipt: every item is added to stock and, when the
    /// inward came from a purchase order, the order records the receipt.
    /// A failure on any item leaves stock and the order untouched.
    pub fn verify_and_update_stock<L: StockLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        order: Option<&mut PurchaseOrder>,
        verified_by: Option<Uuid>,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Verify)?;
        if self.is_verified {
            return Err(WorkflowError::InvalidTransition {
                kind: Self::KIND,
                document_no: self.inward_no.clone(),
                from: "already verified".to_string(),
                action: Action::Verify,
            });
        }

        let home = ledger.home_workshop().to_string();
        let mut targets = Vec::with_capacity(self.items.len());
        for item in &self.items {
            targets.push(ledger.resolve(&item.stock_ref(&home))?.id);
        }

        if let Some(order) = order {
            if Some(order.id) != self.purchase_order_id {
                return Err(WorkflowError::validation(
                    "purchase_order_id",
                    format!("{} is not linked to order {}", self.inward_no, order.order_no),
                ));
            }
            let receipts = self.order_receipts(order);
            if !receipts.is_empty() {
                order.record_inward_receipt(&receipts)?;
            }
        }

        let reason = MovementReason::new(Self::KIND, self.inward_no.clone(), Action::Verify);
        for (item, stock_id) in self.items.iter_mut().zip(targets) {
            ledger.adjust(stock_id, Self::DIRECTION.delta(item.quantity), &reason)?;
            item.stock_id = Some(stock_id);
        }

        let now = Utc::now();
        self.status = StockInwardStatus::Verified;
        self.is_verified = true;
        self.stock_updated = true;
        self.verified_by = verified_by;
        self.verified_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Receipts to back-fill into the linked order. Each item counts only
    /// up to what the order still has outstanding, and an order that can
    /// no longer receive (closed, cancelled) gets nothing. The goods still
    /// go into stock.
    fn order_receipts(&self, order: &PurchaseOrder) -> Vec<PartQuantity> {
        if !order.can(Action::Inward) {
            return Vec::new();
        }
        self.items
            .iter()
            .filter_map(|item| {
                let quantity = item.quantity.min(order.outstanding_qty(&item.part_number));
                (quantity > 0).then(|| PartQuantity {
                    part_number: item.part_number.clone(),
                    quantity,
                    note: Some(format!("Inward {}", self.inward_no)),
                })
            })
            .collect()
    }

    pub fn cancel(&mut self, reason: Option<String>) -> WorkflowResult<()> {
        self.ensure_can(Action::Cancel)?;
        self.status = StockInwardStatus::Cancelled;
        if let Some(reason) = &reason {
            append_note(&mut self.notes, format!("Cancelled: {}", reason));
        }
        self.cancel_reason = reason;
        self.touch();
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

    fn inward(items: Vec<LineItem>) -> StockInward {
        StockInward::new(
            "INW24050001".to_string(),
            NewStockInward {
                vendor_name: "Acme Parts".to_string(),
                receipt_no: Some("R-77".to_string()),
                inward_date: None,
                job_card_no: None,
                reg_no: None,
                items,
                notes: None,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_inward_cannot_be_submitted() {
        let mut empty = inward(vec![]);
        assert_eq!(
            empty.submit_for_verification().unwrap_err(),
            WorkflowError::EmptyDocument {
                kind: DocumentKind::StockInward
            }
        );
    }

    #[test]
    fn test_duplicate_parts_rejected() {
        let line = LineItem::new("A", "Part A", 1, Decimal::ONE);
        let result = StockInward::new(
            "INW1".to_string(),
            NewStockInward {
                vendor_name: "Acme".to_string(),
                receipt_no: None,
                inward_date: None,
                job_card_no: None,
                reg_no: None,
                items: vec![line.clone(), line],
                notes: None,
            },
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_items_locked_after_submission() {
        let mut doc = inward(vec![LineItem::new("A", "Part A", 1, Decimal::ONE)]);
        doc.submit_for_verification().unwrap();
        assert_eq!(doc.status, StockInwardStatus::PendingVerification);
        assert!(doc.update_items(vec![]).is_err());
        doc.cancel(Some("wrong vendor".to_string())).unwrap();
        assert_eq!(doc.status, StockInwardStatus::Cancelled);
        assert_eq!(doc.notes.as_deref(), Some("Cancelled: wrong vendor"));
    }
}
