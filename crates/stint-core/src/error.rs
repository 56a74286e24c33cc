//! Error types for stint operations.
//!
//! Errors carry a structured [`ErrorCode`] for programmatic handling and, where
//! useful, a suggestion the caller can surface to the user.

use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for stint operations.
pub type StintResult<T> = Result<T, StintError>;

/// Main error type for all stint operations.
#[derive(Error, Debug)]
pub enum StintError {
    /// Input validation failed before reaching the estimator or a store.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A prediction record does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        record_id: Option<String>,
    },

    /// A prediction record already carries its actual duration.
    #[error("Prediction {record_id} has already been reconciled")]
    AlreadyReconciled { record_id: Uuid, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error (timestamps, identifiers, stored enums).
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValOutOfRange,

    // Prediction records (REC_xxx)
    RecNotFound,
    RecAlreadyReconciled,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidTimestamp,
    ParseInvalidId,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValOutOfRange => "VAL_003",
            ErrorCode::RecNotFound => "REC_001",
            ErrorCode::RecAlreadyReconciled => "REC_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::ParseInvalidTimestamp => "PARSE_001",
            ErrorCode::ParseInvalidId => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl StintError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a required field that was left empty.
    pub fn missing_field(field: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        Self::Validation {
            message: format!("'{}' must not be empty", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error for a value outside its allowed range.
    pub fn out_of_range(field: &str, value: f64, min: f64, max: f64) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        details.insert("value".to_string(), value.to_string());
        Self::Validation {
            message: format!("'{}' must be within [{}, {}], got {}", field, min, max, value),
            code: ErrorCode::ValOutOfRange,
            details,
            suggestion: Some(format!("Pass a finite value between {} and {}", min, max)),
        }
    }

    /// Create a not found error for a prediction record.
    pub fn not_found(record_id: impl Into<String>) -> Self {
        let id = record_id.into();
        Self::NotFound {
            message: format!("Prediction with id '{}' not found", id),
            code: ErrorCode::RecNotFound,
            record_id: Some(id),
        }
    }

    /// Create an already-reconciled error.
    pub fn already_reconciled(record_id: Uuid) -> Self {
        Self::AlreadyReconciled {
            record_id,
            code: ErrorCode::RecAlreadyReconciled,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a parse error for a stored timestamp.
    pub fn invalid_timestamp(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidTimestamp,
        }
    }

    /// Create a parse error for a stored identifier.
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidId,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::AlreadyReconciled { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the caller supplied bad input (as opposed to a store failure).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotFound { .. } => Some("Please check the prediction ID and ensure it was recorded"),
            Self::AlreadyReconciled { .. } => {
                Some("Each prediction accepts its actual duration exactly once")
            }
            Self::Database { .. } => Some("Please check the database path and file permissions"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StintError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StintError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("lock poisoned: {}", err))
    }
}
