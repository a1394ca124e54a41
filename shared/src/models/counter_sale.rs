//! Counter sale models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{ensure_available, MovementReason, StockDemand, StockLedger, StockRef};
use crate::models::{LineInput, LineItem, PriceBasis, Resolution};
use crate::totals::{compute_totals, Discount, DocumentTotals, Payment};
use crate::types::{append_note, DocumentKind, Vehicle};
use crate::validation;
use crate::workflow::{Action, QuantityFlow, StatusMachine, StockDirection, Transition};

pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CounterSaleStatus {
    Draft,
    Completed,
    Cancelled,
    Refunded,
}

impl CounterSaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for CounterSaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Customer {
    pub name: String,
    pub mobile_no: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterSale {
    pub id: Uuid,
    pub sale_no: String,
    pub sale_date: DateTime<Utc>,
    pub customer: Customer,
    pub reg_no: Option<String>,
    #[serde(default)]
    pub vehicle: Vehicle,
    pub items: Vec<LineItem>,
    pub bill_discount: Option<Discount>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub totals: DocumentTotals,
    pub status: CounterSaleStatus,
    pub stock_deducted: bool,
    pub refund_amount: Option<Decimal>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewCounterSale {
    pub customer: Option<Customer>,
    pub reg_no: Option<String>,
    #[serde(default)]
    pub vehicle: Vehicle,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub bill_discount: Option<Discount>,
    pub notes: Option<String>,
}

/// Header changes allowed while the sale is a draft
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CounterSaleChanges {
    pub customer: Option<Customer>,
    pub reg_no: Option<String>,
    pub vehicle: Option<Vehicle>,
    pub items: Option<Vec<LineItem>>,
    pub bill_discount: Option<Discount>,
    pub notes: Option<String>,
}

/// One-step sale: created, deducted and completed together
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuickSale {
    pub customer: Option<Customer>,
    pub reg_no: Option<String>,
    pub items: Vec<LineInput>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub bill_discount: Option<Discount>,
    pub notes: Option<String>,
}

impl StatusMachine for CounterSale {
    type Status = CounterSaleStatus;
    const KIND: DocumentKind = DocumentKind::CounterSale;
    const TRANSITIONS: &'static [Transition<CounterSaleStatus>] = &[
        Transition {
            action: Action::Update,
            from: &[CounterSaleStatus::Draft],
        },
        Transition {
            action: Action::Complete,
            from: &[CounterSaleStatus::Draft],
        },
        Transition {
            action: Action::Pay,
            from: &[CounterSaleStatus::Draft, CounterSaleStatus::Completed],
        },
        Transition {
            action: Action::Cancel,
            from: &[CounterSaleStatus::Draft, CounterSaleStatus::Completed],
        },
        Transition {
            action: Action::Refund,
            from: &[CounterSaleStatus::Completed],
        },
        Transition {
            action: Action::Delete,
            from: &[CounterSaleStatus::Draft],
        },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn document_no(&self) -> &str {
        &self.sale_no
    }

    fn status(&self) -> CounterSaleStatus {
        self.status
    }
}

impl QuantityFlow for CounterSale {
    const DIRECTION: StockDirection = StockDirection::Outbound;

    fn stock_refs(&self, home_workshop: &str) -> Vec<StockRef> {
        self.items.iter().map(|i| i.stock_ref(home_workshop)).collect()
    }
}

fn walk_in(customer: Option<Customer>) -> Customer {
    match customer {
        Some(c) if !c.name.trim().is_empty() => c,
        Some(c) => Customer {
            name: WALK_IN_CUSTOMER.to_string(),
            ..c
        },
        None => Customer {
            name: WALK_IN_CUSTOMER.to_string(),
            ..Default::default()
        },
    }
}

impl CounterSale {
    pub fn new(sale_no: String, input: NewCounterSale, created_by: Option<Uuid>) -> WorkflowResult<Self> {
        validation::validate_lines(&input.items)?;
        if let Some(mobile) = input.customer.as_ref().and_then(|c| c.mobile_no.as_deref()) {
            validation::validate_mobile_no(mobile)?;
        }

        let now = Utc::now();
        let mut sale = Self {
            id: Uuid::new_v4(),
            sale_no,
            sale_date: now,
            customer: walk_in(input.customer),
            reg_no: input.reg_no,
            vehicle: input.vehicle,
            items: input.items,
            bill_discount: input.bill_discount,
            payments: Vec::new(),
            totals: DocumentTotals::default(),
            status: CounterSaleStatus::Draft,
            stock_deducted: false,
            refund_amount: None,
            completed_at: None,
            cancelled_at: None,
            refunded_at: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        sale.recalculate();
        Ok(sale)
    }

    /// Create and complete a sale in one step. Every item must be in stock
    /// and available before anything is deducted.
    pub fn quick_sale<L: StockLedger + ?Sized>(
        sale_no: String,
        input: QuickSale,
        ledger: &mut L,
        created_by: Option<Uuid>,
    ) -> WorkflowResult<Self> {
        if input.items.is_empty() {
            return Err(WorkflowError::EmptyDocument { kind: Self::KIND });
        }
        let home = ledger.home_workshop().to_string();
        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = Resolution::resolve(&*ledger, &home, line).into_stocked_line(line, PriceBasis::Selling)?;
            items.push(item);
        }

        let mut sale = Self::new(
            sale_no,
            NewCounterSale {
                customer: input.customer,
                reg_no: input.reg_no,
                vehicle: Vehicle::default(),
                items,
                bill_discount: input.bill_discount,
                notes: input.notes,
            },
            created_by,
        )?;
        for payment in input.payments {
            validation::validate_positive_amount("amount", payment.amount)?;
            sale.payments.push(payment);
        }
        sale.complete_sale(ledger)?;
        Ok(sale)
    }

    pub fn recalculate(&mut self) {
        self.totals = compute_totals(self.items.iter_mut(), self.bill_discount.as_ref(), &self.payments);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn update(&mut self, changes: CounterSaleChanges) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        if let Some(items) = &changes.items {
            validation::validate_lines(items)?;
        }
        if let Some(customer) = changes.customer {
            self.customer = walk_in(Some(customer));
        }
        if changes.reg_no.is_some() {
            self.reg_no = changes.reg_no;
        }
        if let Some(vehicle) = changes.vehicle {
            self.vehicle = vehicle;
        }
        if let Some(items) = changes.items {
            self.items = items;
        }
        if changes.bill_discount.is_some() {
            self.bill_discount = changes.bill_discount;
        }
        if changes.notes.is_some() {
            self.notes = changes.notes;
        }
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn add_items(&mut self, items: Vec<LineItem>) -> WorkflowResult<()> {
        self.ensure_can(Action::Update)?;
        validation::validate_lines(&items)?;
        self.items.extend(items);
        self.recalculate();
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> WorkflowResult<LineItem> {
        self.ensure_can(Action::Update)?;
        if index >= self.items.len() {
            return Err(WorkflowError::not_found("sale item", index.to_string()));
        }
        let removed = self.items.remove(index);
        self.recalculate();
        self.touch();
        Ok(removed)
    }

    /// Deduct every item and complete the sale, all or nothing
    pub fn complete_sale<L: StockLedger + ?Sized>(&mut self, ledger: &mut L) -> WorkflowResult<()> {
        self.ensure_can(Action::Complete)?;
        if self.items.is_empty() {
            return Err(WorkflowError::EmptyDocument { kind: Self::KIND });
        }
        let home = ledger.home_workshop().to_string();

        let mut demands = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let stock = ledger.resolve(&item.stock_ref(&home))?;
            demands.push(StockDemand {
                stock_id: stock.id,
                part_number: item.part_number.clone(),
                quantity: item.quantity,
            });
        }
        ensure_available(&*ledger, &demands)?;

        let reason = MovementReason::new(Self::KIND, self.sale_no.clone(), Action::Complete);
        for (item, demand) in self.items.iter_mut().zip(&demands) {
            ledger.adjust(demand.stock_id, Self::DIRECTION.delta(demand.quantity), &reason)?;
            item.stock_id = Some(demand.stock_id);
        }

        let now = Utc::now();
        self.stock_deducted = true;
        self.status = CounterSaleStatus::Completed;
        self.completed_at = Some(now);
        self.recalculate();
        self.updated_at = now;
        Ok(())
    }

    pub fn add_payment(&mut self, payment: Payment) -> WorkflowResult<()> {
        self.ensure_can(Action::Pay)?;
        validation::validate_positive_amount("amount", payment.amount)?;
        self.payments.push(payment);
        self.recalculate();
        self.touch();
        Ok(())
    }

    fn restore_stock<L: StockLedger + ?Sized>(&mut self, ledger: &mut L, action: Action) -> WorkflowResult<()> {
        if !self.stock_deducted {
            return Ok(());
        }
        let home = ledger.home_workshop().to_string();
        let mut plan = Vec::with_capacity(self.items.len());
        for item in &self.items {
            plan.push((ledger.resolve(&item.stock_ref(&home))?.id, item.quantity));
        }
        let reason = MovementReason::new(Self::KIND, self.sale_no.clone(), action);
        for (stock_id, quantity) in plan {
            ledger.adjust(stock_id, Self::DIRECTION.reversed().delta(quantity), &reason)?;
        }
        self.stock_deducted = false;
        Ok(())
    }

    pub fn cancel<L: StockLedger + ?Sized>(&mut self, reason: Option<String>, ledger: &mut L) -> WorkflowResult<()> {
        self.ensure_can(Action::Cancel)?;
        self.restore_stock(ledger, Action::Cancel)?;
        let now = Utc::now();
        self.status = CounterSaleStatus::Cancelled;
        self.cancelled_at = Some(now);
        if let Some(reason) = reason {
            append_note(&mut self.notes, format!("Cancelled: {}", reason));
        }
        self.updated_at = now;
        Ok(())
    }

    /// Refund a completed sale; defaults to the amount paid
    pub fn refund<L: StockLedger + ?Sized>(
        &mut self,
        reason: Option<String>,
        amount: Option<Decimal>,
        ledger: &mut L,
    ) -> WorkflowResult<()> {
        self.ensure_can(Action::Refund)?;
        if let Some(amount) = amount {
            validation::validate_money("refund_amount", amount)?;
            if amount > self.totals.paid_amount {
                return Err(WorkflowError::validation(
                    "refund_amount",
                    format!("cannot exceed the amount paid ({})", self.totals.paid_amount),
                ));
            }
        }
        self.restore_stock(ledger, Action::Refund)?;
        let now = Utc::now();
        self.status = CounterSaleStatus::Refunded;
        self.refund_amount = Some(amount.unwrap_or(self.totals.paid_amount));
        self.refunded_at = Some(now);
        if let Some(reason) = reason {
            append_note(&mut self.notes, format!("Refunded: {}", reason));
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
    use crate::totals::{PaymentMethod, PaymentStatus};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn draft() -> CounterSale {
        CounterSale::new(
            "CS2405170001".to_string(),
            NewCounterSale {
                items: vec![LineItem::new("A", "Part A", 2, dec("100"))],
                ..Default::default()
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_to_walk_in_customer() {
        let sale = draft();
        assert_eq!(sale.customer.name, WALK_IN_CUSTOMER);
        assert_eq!(sale.status, CounterSaleStatus::Draft);
        assert_eq!(sale.totals.total_amount, dec("200"));
    }

    #[test]
    fn test_payments_must_be_positive() {
        let mut sale = draft();
        assert!(sale.add_payment(Payment::new(Decimal::ZERO, PaymentMethod::Cash)).is_err());
        sale.add_payment(Payment::new(dec("50"), PaymentMethod::Upi)).unwrap();
        assert_eq!(sale.totals.payment_status, PaymentStatus::Partial);
        assert_eq!(sale.totals.balance_amount, dec("150"));
    }

    #[test]
    fn test_remove_item_out_of_range() {
        let mut sale = draft();
        assert!(sale.remove_item(3).is_err());
        sale.remove_item(0).unwrap();
        assert!(sale.items.is_empty());
        assert_eq!(sale.totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_refund_needs_completed_sale() {
        let mut sale = draft();
        let mut ledger = crate::ledger::InMemoryLedger::new("main");
        let err = sale.refund(None, None, &mut ledger).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }
}
