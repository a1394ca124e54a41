//! Stock master models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::HashSet;

use crate::error::WorkflowResult;
use crate::types::{round_money, BulkOutcome};
use crate::validation;

/// One stocked part in one workshop. `quantity_on_hand` is only changed
/// through the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: Uuid,
    pub workshop: String,
    pub part_number: String,
    pub part_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity_on_hand: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub tax_type: TaxType,
    pub tax_percent: Decimal,
    pub rack_no: Option<String>,
    pub min_stock_level: i32,
    pub max_stock_level: Option<i32>,
    pub location: Option<String>,
    pub is_active: bool,
    pub last_movement_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tax regime a part is sold under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    #[default]
    Gst,
    Vat,
    Igst,
    Cgst,
    Sgst,
    None,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::Gst => "gst",
            TaxType::Vat => "vat",
            TaxType::Igst => "igst",
            TaxType::Cgst => "cgst",
            TaxType::Sgst => "sgst",
            TaxType::None => "none",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "gst" => Some(TaxType::Gst),
            "vat" => Some(TaxType::Vat),
            "igst" => Some(TaxType::Igst),
            "cgst" => Some(TaxType::Cgst),
            "sgst" => Some(TaxType::Sgst),
            "none" => Some(TaxType::None),
            _ => None,
        }
    }
}

/// Input for registering a part in the stock master
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockItem {
    pub part_number: String,
    pub part_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Defaults to the home workshop
    pub workshop: Option<String>,
    #[serde(default)]
    pub opening_quantity: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    #[serde(default)]
    pub tax_type: TaxType,
    #[serde(default)]
    pub tax_percent: Decimal,
    pub rack_no: Option<String>,
    #[serde(default)]
    pub min_stock_level: i32,
    pub max_stock_level: Option<i32>,
    pub location: Option<String>,
}

/// Editable master attributes. Quantity is deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockItemChanges {
    pub part_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub tax_type: Option<TaxType>,
    pub tax_percent: Option<Decimal>,
    pub rack_no: Option<String>,
    pub min_stock_level: Option<i32>,
    pub max_stock_level: Option<i32>,
    pub location: Option<String>,
}

impl StockItem {
    pub fn new(input: NewStockItem, home_workshop: &str) -> WorkflowResult<Self> {
        validation::validate_part_number(&input.part_number)?;
        validation::validate_required("part_name", &input.part_name)?;
        validation::validate_non_negative_qty("opening_quantity", input.opening_quantity)?;
        validation::validate_money("purchase_price", input.purchase_price)?;
        validation::validate_money("selling_price", input.selling_price)?;
        validation::validate_percent("tax_percent", input.tax_percent)?;
        validation::validate_stock_levels(input.min_stock_level, input.max_stock_level)?;
        let workshop = input
            .workshop
            .filter(|w| !w.trim().is_empty())
            .unwrap_or_else(|| home_workshop.to_string());
        validation::validate_workshop_code("workshop", &workshop)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            workshop,
            part_number: input.part_number.trim().to_string(),
            part_name: input.part_name.trim().to_string(),
            brand: input.brand,
            category: input.category,
            quantity_on_hand: input.opening_quantity,
            purchase_price: input.purchase_price,
            selling_price: input.selling_price,
            tax_type: input.tax_type,
            tax_percent: input.tax_percent,
            rack_no: input.rack_no,
            min_stock_level: input.min_stock_level,
            max_stock_level: input.max_stock_level,
            location: input.location,
            is_active: true,
            last_movement_date: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate a batch of new parts row by row. Rows repeating a
    /// workshop/part key already seen in the batch fail.
    pub fn new_batch(inputs: Vec<NewStockItem>, home_workshop: &str) -> BulkOutcome<Self> {
        let mut outcome = BulkOutcome::default();
        let mut seen = HashSet::new();
        for input in inputs {
            let key = input.part_number.trim().to_string();
            match Self::new(input, home_workshop) {
                Ok(item) if !seen.insert(item.workshop_key()) => {
                    outcome.fail(key, format!("{} appears more than once", item.workshop_key()));
                }
                Ok(item) => outcome.succeeded.push(item),
                Err(err) => outcome.fail(key, err),
            }
        }
        outcome
    }

    /// Zero-quantity copy of this part for another workshop, used when a
    /// transfer lands somewhere the part was never stocked.
    pub fn provision_for(&self, workshop: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workshop: workshop.to_string(),
            quantity_on_hand: 0,
            rack_no: None,
            location: None,
            last_movement_date: now,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn apply_changes(&mut self, changes: StockItemChanges) -> WorkflowResult<()> {
        if let Some(name) = changes.part_name {
            validation::validate_required("part_name", &name)?;
            self.part_name = name.trim().to_string();
        }
        if let Some(price) = changes.purchase_price {
            validation::validate_money("purchase_price", price)?;
            self.purchase_price = price;
        }
        if let Some(price) = changes.selling_price {
            validation::validate_money("selling_price", price)?;
            self.selling_price = price;
        }
        if let Some(percent) = changes.tax_percent {
            validation::validate_percent("tax_percent", percent)?;
            self.tax_percent = percent;
        }
        let min = changes.min_stock_level.unwrap_or(self.min_stock_level);
        let max = changes.max_stock_level.or(self.max_stock_level);
        validation::validate_stock_levels(min, max)?;
        self.min_stock_level = min;
        self.max_stock_level = max;

        if changes.brand.is_some() {
            self.brand = changes.brand;
        }
        if changes.category.is_some() {
            self.category = changes.category;
        }
        if let Some(tax_type) = changes.tax_type {
            self.tax_type = tax_type;
        }
        if changes.rack_no.is_some() {
            self.rack_no = changes.rack_no;
        }
        if changes.location.is_some() {
            self.location = changes.location;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Tax on one unit at the selling price
    pub fn tax_amount(&self) -> Decimal {
        round_money(self.selling_price * self.tax_percent / Decimal::ONE_HUNDRED)
    }

    pub fn selling_price_with_tax(&self) -> Decimal {
        self.selling_price + self.tax_amount()
    }

    /// On-hand quantity valued at purchase price
    pub fn total_value(&self) -> Decimal {
        round_money(Decimal::from(self.quantity_on_hand) * self.purchase_price)
    }

    /// Whole days since the last movement, rounded up
    pub fn ageing_days(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = now.signed_duration_since(self.last_movement_date);
        let seconds = elapsed.num_seconds().abs();
        (seconds + 86_399) / 86_400
    }

    pub fn is_low_stock(&self) -> bool {
        self.min_stock_level > 0 && self.quantity_on_hand <= self.min_stock_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity_on_hand == 0
    }

    /// Key used to look the part up within a workshop
    pub fn workshop_key(&self) -> String {
        workshop_key(&self.workshop, &self.part_number)
    }
}

/// `workshop/part_number` key unique across the stock master
pub fn workshop_key(workshop: &str, part_number: &str) -> String {
    format!("{}/{}", workshop, part_number)
}

/// Stock master row with its derived figures, as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct StockItemView {
    #[serde(flatten)]
    pub item: StockItem,
    pub tax_amount: Decimal,
    pub selling_price_with_tax: Decimal,
    pub total_value: Decimal,
    pub ageing_days: i64,
    pub is_low_stock: bool,
}

impl StockItemView {
    pub fn new(item: StockItem, now: DateTime<Utc>) -> Self {
        Self {
            tax_amount: item.tax_amount(),
            selling_price_with_tax: item.selling_price_with_tax(),
            total_value: item.total_value(),
            ageing_days: item.ageing_days(now),
            is_low_stock: item.is_low_stock(),
            item,
        }
    }
}
