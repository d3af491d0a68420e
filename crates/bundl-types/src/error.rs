//! Error types for the Bundl order lifecycle engine.
//!
//! All errors use the `BNDL_ERR_` prefix convention for easy grepping in
//! logs. Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Credit errors
//! - 3xx: Validation errors
//! - 4xx: Auth errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{OrderId, UserId};

/// Central error enum for all Bundl engine operations.
#[derive(Debug, Error)]
pub enum BundlError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// No snapshot in the live cache or store, or the caller is not a
    /// participant. Deliberately overloaded per spec.md §4.5.4 so a
    /// non-participant lookup cannot be distinguished from a missing order.
    #[error("BNDL_ERR_100: Order not found")]
    OrderNotFound,

    /// Pledging against a completed or expired order.
    #[error("BNDL_ERR_101: Order is not active")]
    OrderNotActive,

    /// The scripted pledge lost the race: `total_pledge` already reached
    /// `amount_needed` before this pledge was applied.
    #[error("BNDL_ERR_102: Order is already fully pledged")]
    OrderFullyPledged,

    /// An order with this id already exists in the durable store.
    #[error("BNDL_ERR_103: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    // =================================================================
    // Credit Errors (2xx)
    // =================================================================
    /// `try_debit` found the user's balance below the requested amount.
    #[error("BNDL_ERR_200: Insufficient credits")]
    InsufficientCredits,

    /// A credit/debit was attempted against a user that does not exist —
    /// an internal bug per spec.md §4.1, never a user-facing condition.
    #[error("BNDL_ERR_201: Unknown user: {0}")]
    UnknownUser(UserId),

    // =================================================================
    // Validation Errors (3xx)
    // =================================================================
    /// Input failed a constraint (min amount, malformed coordinates, ...).
    #[error("BNDL_ERR_300: Validation failed: {reason}")]
    Validation { reason: String },

    // =================================================================
    // Auth Errors (4xx)
    // =================================================================
    /// Missing or invalid bearer token.
    #[error("BNDL_ERR_400: Unauthenticated")]
    Unauthenticated,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BNDL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error (cache snapshot, DTO, ...).
    #[error("BNDL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (missing env var, invalid URL, ...).
    #[error("BNDL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error talking to Postgres, Redis, or the network.
    #[error("BNDL_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BundlError>;

impl From<std::io::Error> for BundlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BundlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = BundlError::OrderNotFound;
        let msg = format!("{err}");
        assert!(msg.starts_with("BNDL_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_credits_display() {
        let err = BundlError::InsufficientCredits;
        let msg = format!("{err}");
        assert!(msg.contains("BNDL_ERR_200"));
    }

    #[test]
    fn validation_display_includes_reason() {
        let err = BundlError::Validation {
            reason: "amountNeeded must be positive".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("BNDL_ERR_300"));
        assert!(msg.contains("amountNeeded"));
    }

    #[test]
    fn all_errors_have_bndl_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(BundlError::OrderNotActive),
            Box::new(BundlError::OrderFullyPledged),
            Box::new(BundlError::Unauthenticated),
            Box::new(BundlError::Internal("test".into())),
            Box::new(BundlError::DuplicateOrder(OrderId::new())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("BNDL_ERR_"),
                "Error missing BNDL_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: BundlError = io_err.into();
        assert!(matches!(err, BundlError::Io(_)));
    }
}
