//! Validation utilities for documents and stock master input

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::LineItem;
use crate::types::DiscountType;

const MAX_PART_NUMBER_LEN: usize = 50;

// ============================================================================
// Field Validations
// ============================================================================

pub fn validate_required(field: &str, value: &str) -> WorkflowResult<()> {
    if value.trim().is_empty() {
        return Err(WorkflowError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Part numbers: letters, digits and `-_/.`, at most 50 characters
pub fn validate_part_number(part_number: &str) -> WorkflowResult<()> {
    let trimmed = part_number.trim();
    validate_required("part_number", trimmed)?;
    if trimmed.len() > MAX_PART_NUMBER_LEN {
        return Err(WorkflowError::validation(
            "part_number",
            format!("must be at most {} characters", MAX_PART_NUMBER_LEN),
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
    {
        return Err(WorkflowError::validation(
            "part_number",
            format!("{} contains unsupported characters", trimmed),
        ));
    }
    Ok(())
}

/// Line quantities are whole units, at least one
pub fn validate_quantity(field: &str, quantity: i32) -> WorkflowResult<()> {
    if quantity < 1 {
        return Err(WorkflowError::validation(field, "must be at least 1"));
    }
    Ok(())
}

pub fn validate_non_negative_qty(field: &str, quantity: i32) -> WorkflowResult<()> {
    if quantity < 0 {
        return Err(WorkflowError::validation(field, "cannot be negative"));
    }
    Ok(())
}

pub fn validate_money(field: &str, amount: Decimal) -> WorkflowResult<()> {
    if amount < Decimal::ZERO {
        return Err(WorkflowError::validation(field, "cannot be negative"));
    }
    Ok(())
}

pub fn validate_positive_amount(field: &str, amount: Decimal) -> WorkflowResult<()> {
    if amount <= Decimal::ZERO {
        return Err(WorkflowError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

pub fn validate_percent(field: &str, percent: Decimal) -> WorkflowResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(WorkflowError::validation(field, "must be between 0 and 100"));
    }
    Ok(())
}

pub fn validate_stock_levels(min: i32, max: Option<i32>) -> WorkflowResult<()> {
    validate_non_negative_qty("min_stock_level", min)?;
    if let Some(max) = max {
        if max < min {
            return Err(WorkflowError::validation(
                "max_stock_level",
                "cannot be below the minimum stock level",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Document Validations
// ============================================================================

/// A priced line must have a sane quantity, price, discount and tax
pub fn validate_line(line: &LineItem) -> WorkflowResult<()> {
    validate_part_number(&line.part_number)?;
    validate_required("part_name", &line.part_name)?;
    validate_quantity("quantity", line.quantity)?;
    validate_money("unit_price", line.unit_price)?;
    validate_money("discount", line.discount)?;
    validate_percent("tax_percent", line.tax_percent)?;
    match line.discount_type {
        DiscountType::Percent => validate_percent("discount", line.discount)?,
        DiscountType::Flat => {
            if line.discount > line.gross() {
                return Err(WorkflowError::validation(
                    "discount",
                    format!("exceeds the line amount for {}", line.part_number),
                ));
            }
        }
    }
    Ok(())
}

pub fn validate_lines<'a>(lines: impl IntoIterator<Item = &'a LineItem>) -> WorkflowResult<()> {
    for line in lines {
        validate_line(line)?;
    }
    Ok(())
}

/// Each part may appear on a document only once
pub fn ensure_unique_parts<'a>(part_numbers: impl IntoIterator<Item = &'a str>) -> WorkflowResult<()> {
    let mut seen = HashSet::new();
    for part_number in part_numbers {
        if !seen.insert(part_number) {
            return Err(WorkflowError::validation(
                "items",
                format!("part {} is listed more than once", part_number),
            ));
        }
    }
    Ok(())
}

/// Workshop codes key stock lookups as `workshop/part_number`, so they
/// may not contain `/`
pub fn validate_workshop_code(field: &str, code: &str) -> WorkflowResult<()> {
    validate_required(field, code)?;
    if code.contains('/') {
        return Err(WorkflowError::validation(field, "must not contain '/'"));
    }
    Ok(())
}

pub fn validate_workshops(from: &str, to: &str) -> WorkflowResult<()> {
    validate_workshop_code("from_workshop", from)?;
    validate_workshop_code("to_workshop", to)?;
    if from.trim() == to.trim() {
        return Err(WorkflowError::validation(
            "to_workshop",
            "source and destination workshops must differ",
        ));
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Phone numbers: 10 digits after stripping separators, optional country code
pub fn validate_mobile_no(mobile: &str) -> WorkflowResult<()> {
    let digits: String = mobile.chars().filter(|c| c.is_ascii_digit()).collect();
    if (10..=13).contains(&digits.len()) {
        Ok(())
    } else {
        Err(WorkflowError::validation("mobile_no", "invalid phone number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_part_number() {
        assert!(validate_part_number("BP-100/A").is_ok());
        assert!(validate_part_number("  ").is_err());
        assert!(validate_part_number("bad part").is_err());
        assert!(validate_part_number(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_line_validation() {
        let line = LineItem::new("A", "Part A", 1, dec("10"));
        assert!(validate_line(&line).is_ok());

        let zero_qty = LineItem { quantity: 0, ..line.clone() };
        assert_eq!(validate_line(&zero_qty).unwrap_err().field(), Some("quantity"));

        let over_discount = line.clone().with_discount(dec("11"), DiscountType::Flat);
        assert_eq!(validate_line(&over_discount).unwrap_err().field(), Some("discount"));

        let over_percent = line.with_discount(dec("101"), DiscountType::Percent);
        assert!(validate_line(&over_percent).is_err());
    }

    #[test]
    fn test_unique_parts() {
        assert!(ensure_unique_parts(["A", "B"]).is_ok());
        assert!(ensure_unique_parts(["A", "B", "A"]).is_err());
    }

    #[test]
    fn test_workshops_must_differ() {
        assert!(validate_workshops("main", "branch").is_ok());
        assert!(validate_workshops("main", "main").is_err());
        assert!(validate_workshops("", "main").is_err());
        assert!(validate_workshops("main", "north/2").is_err());
    }

    #[test]
    fn test_stock_levels() {
        assert!(validate_stock_levels(5, Some(10)).is_ok());
        assert!(validate_stock_levels(5, None).is_ok());
        assert!(validate_stock_levels(5, Some(4)).is_err());
    }

    #[test]
    fn test_mobile_no() {
        assert!(validate_mobile_no("+91 98765 43210").is_ok());
        assert!(validate_mobile_no("12345").is_err());
    }
}
