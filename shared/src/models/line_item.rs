//! Line items shared by every priced document

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{StockLedger, StockRef};
use crate::models::StockItem;
use crate::types::DiscountType;

/// A priced line on a document.
///
/// `stock_id` is a weak reference: a line keeps working when the stock
/// row it was created from goes away, and unresolved lines carry their
/// part details explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub stock_id: Option<Uuid>,
    pub part_number: String,
    pub part_name: String,
    pub brand: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub tax_percent: Decimal,
    /// Derived by [`crate::totals::price_line`]
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub line_total: Decimal,
    pub remarks: Option<String>,
}

impl LineItem {
    pub fn new(
        part_number: impl Into<String>,
        part_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            stock_id: None,
            part_number: part_number.into(),
            part_name: part_name.into(),
            brand: None,
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            discount_type: DiscountType::Flat,
            tax_percent: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            line_total: Decimal::ZERO,
            remarks: None,
        }
    }

    /// Line for a known stock row, priced from it
    pub fn from_stock(item: &StockItem, quantity: i32, basis: PriceBasis) -> Self {
        Self {
            stock_id: Some(item.id),
            brand: item.brand.clone(),
            tax_percent: item.tax_percent,
            ..Self::new(
                item.part_number.clone(),
                item.part_name.clone(),
                quantity,
                basis.price_of(item),
            )
        }
    }

    pub fn with_stock_id(mut self, stock_id: Uuid) -> Self {
        self.stock_id = Some(stock_id);
        self
    }

    pub fn with_tax(mut self, tax_percent: Decimal) -> Self {
        self.tax_percent = tax_percent;
        self
    }

    pub fn with_discount(mut self, discount: Decimal, discount_type: DiscountType) -> Self {
        self.discount = discount;
        self.discount_type = discount_type;
        self
    }

    /// Quantity times unit price, before discount and tax
    pub fn gross(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    pub fn stock_ref(&self, workshop: &str) -> StockRef {
        StockRef {
            stock_id: self.stock_id,
            workshop: workshop.to_string(),
            part_number: self.part_number.clone(),
        }
    }
}

/// Which stock price a new line defaults to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBasis {
    /// Sales and issues
    Selling,
    /// Orders, receipts, vendor returns and transfers
    Purchase,
}

impl PriceBasis {
    pub fn price_of(self, item: &StockItem) -> Decimal {
        match self {
            PriceBasis::Selling => item.selling_price,
            PriceBasis::Purchase => item.purchase_price,
        }
    }
}

/// Client-supplied line. Either `stock_id` or `part_number` identifies the
/// part; anything left out is filled from stock when the part resolves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub stock_id: Option<Uuid>,
    pub part_number: Option<String>,
    pub part_name: Option<String>,
    pub brand: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub discount_type: DiscountType,
    pub tax_percent: Option<Decimal>,
    pub remarks: Option<String>,
}

impl LineInput {
    pub fn for_part(part_number: impl Into<String>, quantity: i32) -> Self {
        Self {
            part_number: Some(part_number.into()),
            quantity,
            ..Default::default()
        }
    }

    /// Human-readable identifier for error messages
    pub fn key(&self) -> String {
        match (&self.part_number, self.stock_id) {
            (Some(part_number), _) => part_number.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "<unidentified part>".to_string(),
        }
    }
}

/// A quantity of one part named on an operation request (inward, reject,
/// issue, return)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartQuantity {
    pub part_number: String,
    pub quantity: i32,
    /// Remarks or rejection reason
    pub note: Option<String>,
}

impl PartQuantity {
    pub fn new(part_number: impl Into<String>, quantity: i32) -> Self {
        Self {
            part_number: part_number.into(),
            quantity,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Outcome of looking a line's part up in stock
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(StockItem),
    Unresolved(LineInput),
}

impl Resolution {
    /// Look the input up by stock id first, then by part number in `workshop`
    pub fn resolve<L: StockLedger + ?Sized>(ledger: &L, workshop: &str, input: &LineInput) -> Self {
        let by_id = input.stock_id.and_then(|id| ledger.lookup(id).ok());
        let found = by_id.or_else(|| {
            input
                .part_number
                .as_deref()
                .and_then(|p| ledger.lookup_part(workshop, p).ok())
        });
        match found {
            Some(item) => Resolution::Resolved(item.clone()),
            None => Resolution::Unresolved(input.clone()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Build the line. Resolved parts fill in whatever the input omitted;
    /// unresolved parts must name their number, name and price.
    pub fn into_line(self, input: &LineInput, basis: PriceBasis) -> WorkflowResult<LineItem> {
        let mut line = match self {
            Resolution::Resolved(item) => {
                let mut line = LineItem::from_stock(&item, input.quantity, basis);
                if let Some(name) = &input.part_name {
                    line.part_name = name.clone();
                }
                if input.brand.is_some() {
                    line.brand = input.brand.clone();
                }
                if let Some(price) = input.unit_price {
                    line.unit_price = price;
                }
                if let Some(tax) = input.tax_percent {
                    line.tax_percent = tax;
                }
                line
            }
            Resolution::Unresolved(input) => {
                let part_number = input
                    .part_number
                    .clone()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| WorkflowError::validation("part_number", "required when the part is not in stock"))?;
                let part_name = input.part_name.clone().ok_or_else(|| {
                    WorkflowError::validation("part_name", format!("required for unstocked part {}", part_number))
                })?;
                let unit_price = input.unit_price.ok_or_else(|| {
                    WorkflowError::validation("unit_price", format!("required for unstocked part {}", part_number))
                })?;
                let mut line = LineItem::new(part_number, part_name, input.quantity, unit_price);
                line.brand = input.brand.clone();
                line.tax_percent = input.tax_percent.unwrap_or(Decimal::ZERO);
                line
            }
        };
        line.discount = input.discount;
        line.discount_type = input.discount_type;
        line.remarks = input.remarks.clone();
        Ok(line)
    }

    /// Like [`Resolution::into_line`], but the part must exist in stock
    pub fn into_stocked_line(self, input: &LineInput, basis: PriceBasis) -> WorkflowResult<LineItem> {
        if !self.is_resolved() {
            return Err(WorkflowError::not_found("stock item", input.key()));
        }
        self.into_line(input, basis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::models::{NewStockItem, TaxType};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ledger() -> InMemoryLedger {
        let item = StockItem::new(
            NewStockItem {
                part_number: "OF-1".to_string(),
                part_name: "Oil filter".to_string(),
                brand: Some("Mann".to_string()),
                category: None,
                workshop: None,
                opening_quantity: 5,
                purchase_price: dec("150"),
                selling_price: dec("200"),
                tax_type: TaxType::Gst,
                tax_percent: dec("18"),
                rack_no: None,
                min_stock_level: 0,
                max_stock_level: None,
                location: None,
            },
            "main",
        )
        .unwrap();
        InMemoryLedger::with_items("main", vec![item]).unwrap()
    }

    #[test]
    fn test_resolved_line_takes_stock_prices() {
        let ledger = ledger();
        let input = LineInput::for_part("OF-1", 2);
        let resolution = Resolution::resolve(&ledger, "main", &input);
        assert!(resolution.is_resolved());

        let line = resolution.into_line(&input, PriceBasis::Selling).unwrap();
        assert_eq!(line.unit_price, dec("200"));
        assert_eq!(line.tax_percent, dec("18"));
        assert!(line.stock_id.is_some());

        let line = Resolution::resolve(&ledger, "main", &input)
            .into_line(&input, PriceBasis::Purchase)
            .unwrap();
        assert_eq!(line.unit_price, dec("150"));
    }

    #[test]
    fn test_unresolved_line_needs_explicit_details() {
        let ledger = ledger();
        let input = LineInput::for_part("NEW-9", 1);
        let resolution = Resolution::resolve(&ledger, "main", &input);
        assert!(!resolution.is_resolved());

        let err = resolution.clone().into_line(&input, PriceBasis::Purchase).unwrap_err();
        assert_eq!(err.field(), Some("part_name"));

        let complete = LineInput {
            part_name: Some("Wiper".to_string()),
            unit_price: Some(dec("45")),
            ..input
        };
        let line = Resolution::resolve(&ledger, "main", &complete)
            .into_line(&complete, PriceBasis::Purchase)
            .unwrap();
        assert_eq!(line.stock_id, None);
        assert_eq!(line.unit_price, dec("45"));
    }

    #[test]
    fn test_stocked_line_rejects_unknown_part() {
        let ledger = ledger();
        let input = LineInput::for_part("NOPE", 1);
        let err = Resolution::resolve(&ledger, "main", &input)
            .into_stocked_line(&input, PriceBasis::Selling)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }
}
