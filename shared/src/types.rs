//! Common types used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round a monetary amount to two decimal places, halves away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// How a discount value is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Absolute amount off
    #[default]
    Flat,
    /// Percentage of the gross amount
    Percent,
}

/// The kinds of records that carry a document number
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PurchaseOrder,
    StockInward,
    StockIssue,
    CounterSale,
    PurchaseReturn,
    StockTransfer,
    StockAdjustment,
    StockAlert,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 8] = [
        DocumentKind::PurchaseOrder,
        DocumentKind::StockInward,
        DocumentKind::StockIssue,
        DocumentKind::CounterSale,
        DocumentKind::PurchaseReturn,
        DocumentKind::StockTransfer,
        DocumentKind::StockAdjustment,
        DocumentKind::StockAlert,
    ];

    /// Document number prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::StockInward => "INW",
            DocumentKind::StockIssue => "ISS",
            DocumentKind::CounterSale => "CS",
            DocumentKind::PurchaseReturn => "PR",
            DocumentKind::StockTransfer => "TRF",
            DocumentKind::StockAdjustment => "ADJ",
            DocumentKind::StockAlert => "ALT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "purchase_order",
            DocumentKind::StockInward => "stock_inward",
            DocumentKind::StockIssue => "stock_issue",
            DocumentKind::CounterSale => "counter_sale",
            DocumentKind::PurchaseReturn => "purchase_return",
            DocumentKind::StockTransfer => "stock_transfer",
            DocumentKind::StockAdjustment => "stock_adjustment",
            DocumentKind::StockAlert => "stock_alert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DocumentKind::PurchaseOrder => "purchase order",
            DocumentKind::StockInward => "stock inward",
            DocumentKind::StockIssue => "stock issue",
            DocumentKind::CounterSale => "counter sale",
            DocumentKind::PurchaseReturn => "purchase return",
            DocumentKind::StockTransfer => "stock transfer",
            DocumentKind::StockAdjustment => "stock adjustment",
            DocumentKind::StockAlert => "stock alert",
        };
        write!(f, "{}", label)
    }
}

/// Vehicle a job card or sale is attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Vehicle {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
}

/// Vendor contact details carried on purchase documents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VendorContact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gst_no: Option<String>,
}

/// A row of a bulk request that was not applied
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkFailure {
    pub key: String,
    pub reason: String,
}

/// Per-row result of a bulk request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> Default for BulkOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BulkOutcome<T> {
    pub fn fail(&mut self, key: impl Into<String>, reason: impl std::fmt::Display) {
        self.failed.push(BulkFailure {
            key: key.into(),
            reason: reason.to_string(),
        });
    }
}

/// Append a line to an optional free-text notes field
pub fn append_note(notes: &mut Option<String>, line: impl AsRef<str>) {
    let line = line.as_ref();
    match notes {
        Some(existing) if !existing.is_empty() => {
            existing.push('\n');
            existing.push_str(line);
        }
        _ => *notes = Some(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec("2.345")), dec("2.35"));
        assert_eq!(round_money(dec("-2.345")), dec("-2.35"));
        assert_eq!(round_money(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn test_document_kind_roundtrip() {
        for kind in DocumentKind::ALL {
            assert_eq!(DocumentKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(DocumentKind::from_str("unknown"), None);
    }

    #[test]
    fn test_append_note() {
        let mut notes = None;
        append_note(&mut notes, "first");
        append_note(&mut notes, "second");
        assert_eq!(notes.as_deref(), Some("first\nsecond"));
    }
}
