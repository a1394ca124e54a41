//! WebAssembly module for the Workshop Inventory Platform
//!
//! Provides client-side computation for:
//! - Document total previews
//! - Purchase order receiving previews
//! - Line validation before submit
//! - Stock level assessment
//! - Document number formatting

use chrono::NaiveDate;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::totals::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("workshop inventory rules loaded"));
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

/// Price the lines and roll up document totals. `bill_discount_json` may
/// be empty.
#[wasm_bindgen]
pub fn preview_totals(lines_json: &str, bill_discount_json: &str, payments_json: &str) -> Result<String, JsValue> {
    let mut lines: Vec<LineItem> = serde_json::from_str(lines_json).map_err(|e| js_error("Invalid lines JSON", e))?;
    let bill_discount: Option<Discount> = if bill_discount_json.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(bill_discount_json).map_err(|e| js_error("Invalid discount JSON", e))?)
    };
    let payments: Vec<Payment> = if payments_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(payments_json).map_err(|e| js_error("Invalid payments JSON", e))?
    };

    let totals = compute_totals(lines.iter_mut(), bill_discount.as_ref(), &payments);
    serde_json::to_string(&totals).map_err(|e| js_error("Serialization failed", e))
}

/// Validate lines the way the server will; returns the first problem
#[wasm_bindgen]
pub fn validate_line_items(lines_json: &str) -> Result<(), JsValue> {
    let lines: Vec<LineItem> = serde_json::from_str(lines_json).map_err(|e| js_error("Invalid lines JSON", e))?;
    validate_lines(&lines).map_err(|e| JsValue::from_str(&e.to_string()))?;
    ensure_unique_parts(lines.iter().map(|l| l.part_number.as_str())).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Status and pending parts an order would have after receiving `parts_json`
/// (empty to just re-derive). Fails with the bound the server would enforce.
#[wasm_bindgen]
pub fn preview_purchase_order(order_json: &str, parts_json: &str) -> Result<String, JsValue> {
    let mut order: PurchaseOrder = serde_json::from_str(order_json).map_err(|e| js_error("Invalid order JSON", e))?;
    if parts_json.trim().is_empty() {
        order.recalculate();
    } else {
        let parts: Vec<PartQuantity> =
            serde_json::from_str(parts_json).map_err(|e| js_error("Invalid parts JSON", e))?;
        order
            .record_inward_receipt(&parts)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
    }
    serde_json::to_string(&order).map_err(|e| js_error("Serialization failed", e))
}

/// Payment status label for a total and an amount paid
#[wasm_bindgen]
pub fn payment_status_label(total_amount: f64, paid_amount: f64) -> String {
    let total = Decimal::try_from(total_amount).unwrap_or(Decimal::ZERO);
    let paid = Decimal::try_from(paid_amount).unwrap_or(Decimal::ZERO);
    format!("{}", payment_status(total, paid))
}

/// Alert classification for a stock row, or `null` when it is not low
#[wasm_bindgen]
pub fn assess_stock_level(item_json: &str) -> Result<String, JsValue> {
    let item: StockItem = serde_json::from_str(item_json).map_err(|e| js_error("Invalid stock JSON", e))?;
    serde_json::to_string(&assess(&item)).map_err(|e| js_error("Serialization failed", e))
}

/// Browser-local date
fn today() -> Result<NaiveDate, JsValue> {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .ok_or_else(|| JsValue::from_str("Invalid browser date"))
}

/// Document number for a kind (`purchase_order`, `counter_sale`, ...),
/// an ISO date (empty for today) and a sequence value
#[wasm_bindgen]
pub fn format_document_no(kind: &str, date: &str, sequence: u32) -> Result<String, JsValue> {
    let kind: DocumentKind = serde_json::from_value(serde_json::Value::String(kind.to_string()))
        .map_err(|e| js_error("Unknown document kind", e))?;
    let date = if date.trim().is_empty() {
        today()?
    } else {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| js_error("Invalid date", e))?
    };
    let prefix = shared::document_prefix(kind, date);
    Ok(shared::format_document_number(&prefix, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_totals_without_discount() {
        let lines = r#"[{"part_number":"BRK-001","part_name":"Brake pad","quantity":2,"unit_price":"100"}]"#;
        let totals: DocumentTotals = serde_json::from_str(&preview_totals(lines, "", "").unwrap()).unwrap();
        assert_eq!(totals.total_quantity, 2);
        assert_eq!(totals.total_amount, Decimal::new(200, 0));
        assert_eq!(totals.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_preview_purchase_order_receiving() {
        let mut order = PurchaseOrder::new(
            "PO24050001".to_string(),
            NewPurchaseOrder {
                vendor_name: "Acme Parts".to_string(),
                vendor_contact: Default::default(),
                job_card_no: None,
                reg_no: None,
                order_date: None,
                ordered_parts: vec![LineItem::new("BRK-001", "Brake pad", 20, Decimal::from(100))],
                notes: None,
            },
            None,
        )
        .unwrap();
        order.submit().unwrap();
        let order_json = serde_json::to_string(&order).unwrap();

        let preview: PurchaseOrder = serde_json::from_str(
            &preview_purchase_order(&order_json, r#"[{"part_number":"BRK-001","quantity":15,"note":null}]"#).unwrap(),
        )
        .unwrap();
        assert_eq!(preview.status, PurchaseOrderStatus::PartiallyReceived);
        assert_eq!(preview.pending_parts[0].quantity, 5);
    }

    #[test]
    fn test_payment_status_label() {
        assert_eq!(payment_status_label(100.0, 0.0), "Unpaid");
        assert_eq!(payment_status_label(100.0, 40.0), "Partial");
        assert_eq!(payment_status_label(100.0, 100.0), "Paid");
    }

    #[test]
    fn test_format_document_no() {
        assert_eq!(format_document_no("purchase_order", "2024-05-17", 7).unwrap(), "PO24050007");
        assert_eq!(format_document_no("counter_sale", "2024-05-17", 3).unwrap(), "CS2405170003");
    }
}
