//! HTTP request handlers

pub mod counter_sale;
pub mod health;
pub mod purchase_order;
pub mod purchase_return;
pub mod stock;
pub mod stock_alert;
pub mod stock_inward;
pub mod stock_issue;
pub mod stock_transfer;

pub use counter_sale::*;
pub use health::*;
pub use purchase_order::*;
pub use purchase_return::*;
pub use stock::*;
pub use stock_alert::*;
pub use stock_inward::*;
pub use stock_issue::*;
pub use stock_transfer::*;
