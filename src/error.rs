//! Error types for fitdistill
//!
//! This module defines the error types used throughout the fitdistill library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Most data-level problems in this crate are deliberately *not* errors: an
//! unparseable value, date, or duration is treated as an absent field, and a
//! file that cannot be decoded still produces an index entry carrying the
//! collected error strings. `DistillError` is reserved for failures the
//! pipeline cannot absorb, such as being unable to write an output stream.

use thiserror::Error;

/// Main error type for fitdistill operations
#[derive(Error, Debug)]
pub enum DistillError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in fitdistill
pub type Result<T> = std::result::Result<T, DistillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DistillError::InvalidArgument("workers must be positive".to_string());
        assert_eq!(error.to_string(), "Invalid argument: workers must be positive");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let distill_error: DistillError = io_error.into();
        assert!(matches!(distill_error, DistillError::Io(_)));
    }
}
