//! Database models for the workshop inventory server
//!
//! Re-exports models from the shared crate and adds the relational rows
//! the stock master and movement history are stored as.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub use shared::models::*;

/// Columns selected whenever a stock row is loaded
pub const STOCK_COLUMNS: &str = "id, workshop, part_number, part_name, brand, category, quantity_on_hand, \
     purchase_price, selling_price, tax_type, tax_percent, rack_no, min_stock_level, max_stock_level, \
     location, is_active, last_movement_date, created_at, updated_at";

/// `stock_items` row
#[derive(Debug, FromRow)]
pub struct StockRow {
    pub id: Uuid,
    pub workshop: String,
    pub part_number: String,
    pub part_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity_on_hand: i32,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub tax_type: String,
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

impl From<StockRow> for StockItem {
    fn from(row: StockRow) -> Self {
        StockItem {
            id: row.id,
            workshop: row.workshop,
            part_number: row.part_number,
            part_name: row.part_name,
            brand: row.brand,
            category: row.category,
            quantity_on_hand: row.quantity_on_hand,
            purchase_price: row.purchase_price,
            selling_price: row.selling_price,
            tax_type: TaxType::from_str(&row.tax_type).unwrap_or_default(),
            tax_percent: row.tax_percent,
            rack_no: row.rack_no,
            min_stock_level: row.min_stock_level,
            max_stock_level: row.max_stock_level,
            location: row.location,
            is_active: row.is_active,
            last_movement_date: row.last_movement_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `stock_movements` row, the audit trail of committed ledger deltas
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementRecord {
    pub id: i64,
    pub stock_id: Uuid,
    pub workshop: String,
    pub part_number: String,
    pub delta: i32,
    pub quantity_after: i32,
    pub document_kind: String,
    pub document_no: String,
    pub action: String,
    pub note: Option<String>,
    pub moved_at: DateTime<Utc>,
}
