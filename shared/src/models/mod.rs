//! Domain models for workshop inventory: the stock master and the
//! documents that move stock

mod counter_sale;
mod line_item;
mod purchase_order;
mod purchase_return;
mod stock;
mod stock_alert;
mod stock_inward;
mod stock_issue;
mod stock_transfer;

pub use counter_sale::*;
pub use line_item::*;
pub use purchase_order::*;
pub use purchase_return::*;
pub use stock::*;
pub use stock_alert::*;
pub use stock_inward::*;
pub use stock_issue::*;
pub use stock_transfer::*;
