//! Line and document totals
//!
//! Every amount is rounded to two decimals at each step, so recomputing
//! the totals of an already-priced document changes nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::LineItem;
use crate::types::{round_money, DiscountType};

/// A discount applied to a whole bill
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Discount {
    pub value: Decimal,
    #[serde(default)]
    pub discount_type: DiscountType,
}

impl Discount {
    pub fn flat(value: Decimal) -> Self {
        Self {
            value,
            discount_type: DiscountType::Flat,
        }
    }

    pub fn percent(value: Decimal) -> Self {
        Self {
            value,
            discount_type: DiscountType::Percent,
        }
    }

    /// Amount this discount takes off `base`, rounded
    pub fn amount_on(&self, base: Decimal) -> Decimal {
        discount_amount(base, self.value, self.discount_type)
    }
}

fn discount_amount(base: Decimal, value: Decimal, discount_type: DiscountType) -> Decimal {
    match discount_type {
        DiscountType::Percent => round_money(base * value / Decimal::ONE_HUNDRED),
        DiscountType::Flat => round_money(value),
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Upi,
    BankTransfer,
    Cheque,
    Credit,
    Other,
}

/// A payment recorded against a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(amount: Decimal, method: PaymentMethod) -> Self {
        Self {
            amount,
            method,
            reference: None,
            paid_at: Utc::now(),
        }
    }
}

/// Settlement state derived from total and paid amounts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
            PaymentStatus::Partial => write!(f, "Partial"),
            PaymentStatus::Paid => write!(f, "Paid"),
        }
    }
}

pub fn payment_status(total_amount: Decimal, paid_amount: Decimal) -> PaymentStatus {
    if paid_amount >= total_amount {
        PaymentStatus::Paid
    } else if paid_amount > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// Document-level money and quantity figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DocumentTotals {
    pub total_quantity: i32,
    /// Sum of quantity times unit price
    pub subtotal: Decimal,
    pub item_discount: Decimal,
    pub bill_discount: Decimal,
    pub total_discount: Decimal,
    pub total_tax: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_amount: Decimal,
    pub payment_status: PaymentStatus,
}

/// Fill in a line's derived discount, tax and total
pub fn price_line(line: &mut LineItem) {
    let gross = line.gross();
    line.discount_amount = discount_amount(gross, line.discount, line.discount_type);
    let item_subtotal = gross - line.discount_amount;
    line.tax_amount = round_money(item_subtotal * line.tax_percent / Decimal::ONE_HUNDRED);
    line.line_total = round_money(item_subtotal + line.tax_amount);
}

/// Price every line, then roll the document up
pub fn compute_totals<'a, I>(lines: I, bill_discount: Option<&Discount>, payments: &[Payment]) -> DocumentTotals
where
    I: IntoIterator<Item = &'a mut LineItem>,
{
    let mut totals = DocumentTotals::default();
    for line in lines {
        price_line(line);
        totals.total_quantity += line.quantity;
        totals.subtotal += line.gross();
        totals.item_discount += line.discount_amount;
        totals.total_tax += line.tax_amount;
    }
    totals.subtotal = round_money(totals.subtotal);

    let pre_bill = totals.subtotal - totals.item_discount + totals.total_tax;
    totals.bill_discount = bill_discount.map(|d| d.amount_on(pre_bill)).unwrap_or(Decimal::ZERO);
    totals.total_discount = totals.item_discount + totals.bill_discount;
    totals.total_amount = round_money((pre_bill - totals.bill_discount).max(Decimal::ZERO));

    totals.paid_amount = round_money(payments.iter().map(|p| p.amount).sum());
    totals.balance_amount = (totals.total_amount - totals.paid_amount).max(Decimal::ZERO);
    totals.payment_status = payment_status(totals.total_amount, totals.paid_amount);
    totals
}
