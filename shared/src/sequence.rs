//! Document numbering
//!
//! Numbers are a kind prefix, a date stamp and a four-digit sequence that
//! restarts for every prefix: `PO24050001`, `CS2405170003`. Counter sales
//! roll over daily, every other kind monthly.

use chrono::NaiveDate;

use crate::types::DocumentKind;

/// Prefix a document number is allocated under
pub fn document_prefix(kind: DocumentKind, date: NaiveDate) -> String {
    let stamp = match kind {
        DocumentKind::CounterSale => date.format("%y%m%d"),
        _ => date.format("%y%m"),
    };
    format!("{}{}", kind.prefix(), stamp)
}

pub fn format_document_number(prefix: &str, sequence: u32) -> String {
    format!("{}{:04}", prefix, sequence)
}

/// Sequence part of a number allocated under `prefix`
pub fn parse_sequence(document_no: &str, prefix: &str) -> Option<u32> {
    document_no.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may_17() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_monthly_prefixes() {
        assert_eq!(document_prefix(DocumentKind::PurchaseOrder, may_17()), "PO2405");
        assert_eq!(document_prefix(DocumentKind::StockInward, may_17()), "INW2405");
        assert_eq!(document_prefix(DocumentKind::StockTransfer, may_17()), "TRF2405");
    }

    #[test]
    fn test_counter_sales_roll_daily() {
        assert_eq!(document_prefix(DocumentKind::CounterSale, may_17()), "CS240517");
    }

    #[test]
    fn test_format_and_parse() {
        let number = format_document_number("ISS2405", 7);
        assert_eq!(number, "ISS24050007");
        assert_eq!(parse_sequence(&number, "ISS2405"), Some(7));
        assert_eq!(parse_sequence(&number, "PO2405"), None);
        assert_eq!(format_document_number("PR2405", 12345), "PR240512345");
    }
}
