// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store file exists but could not be read or parsed.
    /// Fatal to a cycle: nothing is written after a failed load.
    #[error("Store codec error: {0}")]
    Codec(String),

    /// Writing the store or the delta file failed.
    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Notification error: {0}")]
    Notify(String),

    /// A reconciliation cycle is already running.
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
