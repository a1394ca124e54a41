//! Shared types and models for the workshop inventory platform
//!
//! This crate holds the stock ledger, document models and their state
//! machines. It is pure: persistence and transport live in the backend,
//! and the same rules are compiled to WASM for client-side previews.

pub mod error;
pub mod ledger;
pub mod models;
pub mod sequence;
pub mod totals;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::*;
pub use ledger::*;
pub use models::*;
pub use sequence::*;
pub use totals::*;
pub use types::*;
pub use workflow::*;
