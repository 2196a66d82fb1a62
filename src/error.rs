//! Error types for Reactgram
//!
//! All errors in the client are converted to `AppError`. The gateway
//! normalizes expected absence into `Ok(None)`; everything else travels
//! as an `AppError` and is classified by [`AppError::kind`].

use thiserror::Error;

/// How a failure should be treated by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource not found or no active session; reported as an empty result
    Absent,
    /// The service rejected the operation; surfaced to the initiating view
    Failure,
    /// Programmer error; the operation aborts immediately
    Fault,
}

/// Client-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// No valid session (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Duplicate id or unique constraint violation (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected before or by the service (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other non-success response from the platform
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Blob storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transport-level failure
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A platform record did not match its schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// JSON encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required argument was missing
    #[error("Missing {0}")]
    MissingArgument(&'static str),

    /// A cache entry was read with a different type than it was written with
    #[error("Cached value for {0} has an unexpected type")]
    TypeMismatch(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound | AppError::Unauthorized => ErrorKind::Absent,
            AppError::MissingArgument(_) | AppError::TypeMismatch(_) | AppError::Internal(_) => {
                ErrorKind::Fault
            }
            _ => ErrorKind::Failure,
        }
    }

    /// Whether this error means "nothing there" rather than "something broke"
    pub fn is_absent(&self) -> bool {
        self.kind() == ErrorKind::Absent
    }

    /// Short label used for metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation",
            AppError::Backend { .. } => "backend",
            AppError::Storage(_) => "storage",
            AppError::HttpClient(_) => "http_client",
            AppError::Schema(_) => "schema",
            AppError::Serialization(_) => "serialization",
            AppError::Config(_) => "config",
            AppError::MissingArgument(_) => "missing_argument",
            AppError::TypeMismatch(_) => "type_mismatch",
            AppError::Internal(_) => "internal",
        }
    }

    /// Map a non-success platform response to an error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => AppError::Validation(message),
            401 => AppError::Unauthorized,
            403 => AppError::Forbidden,
            404 => AppError::NotFound,
            409 => AppError::Conflict(message),
            _ => AppError::Backend { status, message },
        }
    }

    /// Record this error in the error counter
    pub fn record(&self) {
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.error_type()]).inc();
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
