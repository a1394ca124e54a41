//! Errors raised by the stock ledger and document workflows

use thiserror::Error;

use crate::types::DocumentKind;
use crate::workflow::Action;

/// Every failure a document operation can report.
///
/// Each variant carries enough context for the caller to show which part
/// or document the failure is about.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("cannot {action} {kind} {document_no} while it is {from}")]
    InvalidTransition {
        kind: DocumentKind,
        document_no: String,
        from: String,
        action: Action,
    },

    #[error("insufficient stock for {part_number}: available {available}, requested {requested}")]
    InsufficientStock {
        part_number: String,
        available: i32,
        requested: i32,
    },

    #[error("cannot issue {requested} of {part_number}: at most {max} outstanding")]
    ExceedsRequestedQuantity {
        part_number: String,
        requested: i32,
        max: i32,
    },

    #[error("cannot receive {requested} of {part_number}: at most {max} outstanding on the order")]
    ExceedsOrderedQuantity {
        part_number: String,
        requested: i32,
        max: i32,
    },

    #[error("cannot return {requested} of {part_number}: at most {max} returnable")]
    ExceedsIssuedQuantity {
        part_number: String,
        requested: i32,
        max: i32,
    },

    #[error("cannot account for {requested} of {part_number}: only {max} were sent")]
    ExceedsSentQuantity {
        part_number: String,
        requested: i32,
        max: i32,
    },

    #[error("duplicate {entity}: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("{kind} has no line items")]
    EmptyDocument { kind: DocumentKind },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ExceedsRequestedQuantity { .. } => "EXCEEDS_REQUESTED_QUANTITY",
            Self::ExceedsOrderedQuantity { .. } => "EXCEEDS_ORDERED_QUANTITY",
            Self::ExceedsIssuedQuantity { .. } => "EXCEEDS_ISSUED_QUANTITY",
            Self::ExceedsSentQuantity { .. } => "EXCEEDS_SENT_QUANTITY",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::EmptyDocument { .. } => "EMPTY_DOCUMENT",
            Self::Validation { .. } => "VALIDATION_ERROR",
        }
    }

    /// The field a validation failure points at, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
