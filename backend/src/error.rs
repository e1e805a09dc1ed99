//! Error handling for the factory ledger
//!
//! Every failure falls into one of three families: validation (rejected
//! before a transaction opens), conflict (detected inside a transaction,
//! which is then rolled back) and system (store or internal trouble). Only
//! transient store failures are worth retrying.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::Location;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions: requires {0}")]
    InsufficientPermissions(String),

    // Validation errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger conflicts
    #[error("Fund not found: {0}")]
    FundNotFound(Uuid),

    #[error("Fund {0} is not active")]
    FundInactive(Uuid),

    #[error("Insufficient balance on fund {fund_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        fund_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient funds on fund {fund_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        fund_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient stock of material {material_id}: requested {requested}, available {available}")]
    InsufficientStock {
        material_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient inventory at {location}: requested {requested}, available {available}")]
    InsufficientInventory {
        location: Location,
        requested: i64,
        available: i64,
    },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Source and destination are both {0}")]
    SameLocation(Location),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error family used for status mapping, logging and retry advice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Validation,
    NotFound,
    Conflict,
    System,
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Unauthorized(_) | AppError::InsufficientPermissions(_) => ErrorKind::Auth,
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::NotFound(_) | AppError::FundNotFound(_) => ErrorKind::NotFound,
            AppError::FundInactive(_)
            | AppError::InsufficientBalance { .. }
            | AppError::InsufficientFunds { .. }
            | AppError::InsufficientStock { .. }
            | AppError::InsufficientInventory { .. }
            | AppError::InvalidTransition { .. }
            | AppError::SameLocation(_)
            | AppError::InvalidLocation(_)
            | AppError::Store(StoreError::Duplicate(_)) => ErrorKind::Conflict,
            AppError::Store(_) | AppError::Internal(_) => ErrorKind::System,
        }
    }

    /// Whether the caller may resubmit the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Store(StoreError::Retryable(_)) | AppError::Store(StoreError::FailPoint(_))
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InsufficientPermissions(_) => "INSUFFICIENT_PERMISSIONS",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::FundNotFound(_) => "FUND_NOT_FOUND",
            AppError::FundInactive(_) => "FUND_INACTIVE",
            AppError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::SameLocation(_) => "SAME_LOCATION",
            AppError::InvalidLocation(_) => "INVALID_LOCATION",
            AppError::Store(StoreError::Duplicate(_)) => "DUPLICATE",
            AppError::Store(StoreError::Retryable(_)) | AppError::Store(StoreError::FailPoint(_)) => {
                "STORE_UNAVAILABLE"
            }
            AppError::Store(_) => "STORE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::FundNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Retryable(_)) | AppError::Store(StoreError::FailPoint(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::CONFLICT,
        }
    }

    /// Caller-facing message. System errors never expose their cause.
    fn public_message(&self) -> String {
        match self {
            AppError::Store(StoreError::Duplicate(what)) => {
                format!("A record with the same {} already exists", what)
            }
            AppError::Store(StoreError::Retryable(_)) | AppError::Store(StoreError::FailPoint(_)) => {
                "The ledger is temporarily unavailable; no changes were made, please retry".to_string()
            }
            AppError::Store(_) | AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("request".to_string(), "Invalid request".to_string()));

        AppError::Validation { field, message }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
                field: None,
                retryable: false,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::System => tracing::error!(error = ?self, "ledger operation failed"),
            ErrorKind::Conflict => tracing::warn!(code = self.code(), "{}", self),
            _ => tracing::debug!(code = self.code(), "{}", self),
        }

        let field = match &self {
            AppError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.public_message(),
                field,
                retryable: self.is_retryable(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_are_not_retryable() {
        let err = AppError::SameLocation(Location::Transit);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_errors_are_retryable_and_opaque() {
        let err = AppError::Store(StoreError::Retryable("deadlock detected".to_string()));
        assert!(err.is_retryable());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.public_message().contains("deadlock"));
    }

    #[test]
    fn test_corrupt_rows_are_not_retryable() {
        let err = AppError::Store(StoreError::Corrupt("unknown batch status 'dyeing'".to_string()));
        assert_eq!(err.kind(), ErrorKind::System);
        assert!(!err.is_retryable());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "STORE_ERROR");
        assert!(!err.public_message().contains("dyeing"));
    }

    #[test]
    fn test_database_errors_are_not_retryable() {
        let err = AppError::Store(StoreError::Database(sqlx::Error::RowNotFound));
        assert!(!err.is_retryable());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_errors_are_not_retryable() {
        let err = AppError::Internal("fund totals overflow".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_duplicates_are_conflicts() {
        let err = AppError::Store(StoreError::Duplicate("sku".to_string()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "DUPLICATE");
    }

    #[test]
    fn test_invalid_transition_maps_to_unprocessable() {
        let err = AppError::InvalidTransition {
            from: "pending".to_string(),
            to: "ironing".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }
}
