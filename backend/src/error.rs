//! Error handling for the workshop inventory server
//!
//! `AppError` is the one place where failure kinds become HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::WorkflowError;
use thiserror::Error;

/// Postgres SQLSTATE for unique violations
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for check violations
const CHECK_VIOLATION: &str = "23514";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Ledger and document workflow errors
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A stock row's non-negative check rejected a write
    #[error("Stock constraint violated: {0}")]
    StockConstraint(String),

    // Validation errors
    #[error("Validation error: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::Workflow(WorkflowError::DuplicateKey {
                        entity: "record",
                        key: constraint,
                    })
                }
                Some(CHECK_VIOLATION) => return AppError::StockConstraint(constraint),
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }
}

fn workflow_status(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::DuplicateKey { .. } | WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
        WorkflowError::InsufficientStock { .. }
        | WorkflowError::ExceedsRequestedQuantity { .. }
        | WorkflowError::ExceedsOrderedQuantity { .. }
        | WorkflowError::ExceedsIssuedQuantity { .. }
        | WorkflowError::ExceedsSentQuantity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::EmptyDocument { .. } | WorkflowError::Validation { .. } => StatusCode::BAD_REQUEST,
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TokenExpired | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Workflow(err) => workflow_status(err),
            AppError::StockConstraint(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) | AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::TokenExpired => ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            AppError::InvalidToken => ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            AppError::InsufficientPermissions => ErrorDetail::new(
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action",
            ),
            AppError::Workflow(err) => ErrorDetail {
                code: err.code().to_string(),
                message: err.to_string(),
                field: err.field().map(str::to_string),
            },
            AppError::StockConstraint(constraint) => ErrorDetail::new(
                "INSUFFICIENT_STOCK",
                format!("Stock would go negative ({})", constraint),
            ),
            AppError::InvalidInput(errors) => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: errors.to_string(),
                field: errors.field_errors().keys().next().map(|f| f.to_string()),
            },
            AppError::Configuration(msg) => {
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", msg))
            }
            AppError::DatabaseError(_) => ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            AppError::InternalError(_) => ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
