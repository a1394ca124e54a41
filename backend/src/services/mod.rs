//! Business logic services for the workshop inventory platform

pub mod counter_sale;
pub mod ledger;
pub mod purchase_order;
pub mod purchase_return;
pub mod sequence;
pub mod stock;
pub mod stock_alert;
pub mod stock_inward;
pub mod stock_issue;
pub mod stock_transfer;
pub mod store;
pub mod workflow;

pub use counter_sale::CounterSaleService;
pub use purchase_order::PurchaseOrderService;
pub use purchase_return::PurchaseReturnService;
pub use stock::StockService;
pub use stock_alert::StockAlertService;
pub use stock_inward::StockInwardService;
pub use stock_issue::StockIssueService;
pub use stock_transfer::StockTransferService;
pub use workflow::WorkflowContext;

use serde::Deserialize;
use shared::{LineInput, StockRef};
use validator::Validate;

use crate::services::store::DocumentFilter;

/// Query string shared by every document listing
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListQuery {
    pub status: Option<String>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn filter(&self) -> DocumentFilter {
        DocumentFilter {
            status: self.status.clone(),
            limit: self.limit.unwrap_or(50),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Body of every cancel request
#[derive(Debug, Default, Deserialize)]
pub struct CancelInput {
    pub reason: Option<String>,
}

/// Stock rows client lines refer to, by id or by part number in `workshop`
pub fn line_refs(lines: &[LineInput], workshop: &str) -> Vec<StockRef> {
    lines
        .iter()
        .map(|line| StockRef {
            stock_id: line.stock_id,
            workshop: workshop.to_string(),
            part_number: line.part_number.clone().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let filter = ListQuery::default().filter();
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_line_refs_prefer_stock_id() {
        let id = uuid::Uuid::new_v4();
        let lines = vec![
            LineInput {
                stock_id: Some(id),
                quantity: 1,
                ..Default::default()
            },
            LineInput::for_part("BRK-001", 2),
        ];
        let refs = line_refs(&lines, "main");
        assert_eq!(refs[0].stock_id, Some(id));
        assert_eq!(refs[1].part_number, "BRK-001");
        assert_eq!(refs[1].workshop, "main");
    }
}
