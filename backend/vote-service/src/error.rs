//! Error types for vote-service
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Errors reported by a `LedgerStore` or `PostStore`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The (post, voter) pair is already recorded
    #[error("Vote already recorded")]
    AlreadyVoted,

    /// No vote row exists for the (post, voter) pair
    #[error("No vote recorded")]
    NotVoted,

    #[error("Post not found")]
    NotFound,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound,
            other => LedgerError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Errors surfaced to callers of the vote coordinator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Only surfaced ledger conditions convert cleanly. `AlreadyVoted` and
/// `NotVoted` are absorbed by the coordinator before it ever converts.
impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound => ServiceError::NotFound("post".to_string()),
            LedgerError::StorageUnavailable(msg) => ServiceError::StorageUnavailable(msg),
            LedgerError::AlreadyVoted | LedgerError::NotVoted => {
                ServiceError::Internal(format!("unabsorbed ledger condition: {}", err))
            }
        }
    }
}

impl ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::StorageUnavailable(_) => "storage_unavailable",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }))
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for store operations
pub type LedgerResult<T> = Result<T, LedgerError>;
