//! Error types for the loyalty engine
//!
//! # Error Categories
//!
//! - **Caller errors**: malformed or missing input (`InvalidInput`)
//! - **Lifecycle errors**: unknown transaction (`NotFound`) or a transaction
//!   that is no longer pending (`Conflict`)
//! - **Store errors**: ledger store I/O failures and optimistic-update
//!   contention that outlasted the retry budget
//!
//! Single-item operations return these directly. The bulk processor catches
//! them per item and records them in its summary.

use super::transaction::TransactionStatus;
use thiserror::Error;

/// Errors raised by a [`crate::core::LedgerStore`] implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The document changed since it was read
    ///
    /// Retried by [`crate::core::optimistic::with_optimistic_update`].
    #[error("Write conflict on {key}")]
    Conflict {
        /// Document key (member id or doc path)
        key: String,
    },

    /// The store could not be reached or failed the request
    #[error("Ledger store unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },
}

impl StoreError {
    pub fn conflict(key: &str) -> Self {
        StoreError::Conflict {
            key: key.to_string(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

/// Main error type for the loyalty engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoyaltyError {
    /// Missing or malformed request field
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// No transaction at the given doc path
    #[error("Transaction {doc_path} not found")]
    NotFound {
        /// Requested doc path
        doc_path: String,
    },

    /// Transaction already left the pending state
    ///
    /// This is the idempotency guard: a second verify must fail here
    /// rather than disburse twice.
    #[error("Transaction {doc_path} is not pending (status: {status})")]
    Conflict {
        /// Requested doc path
        doc_path: String,
        /// Status found at resolve time
        status: TransactionStatus,
    },

    /// Store I/O failure
    #[error("Ledger store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the failure
        message: String,
    },

    /// Optimistic update kept conflicting past the retry budget
    #[error("Gave up updating {key} after {attempts} conflicting attempts")]
    RetryExhausted {
        /// Document key under contention
        key: String,
        /// Attempts made
        attempts: u32,
    },

    /// Anything else that is not the caller's fault
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl From<StoreError> for LoyaltyError {
    fn from(error: StoreError) -> Self {
        match error {
            // A conflict that escapes the retry loop is not retryable by the caller
            StoreError::Conflict { key } => LoyaltyError::RetryExhausted { key, attempts: 1 },
            StoreError::Unavailable { message } => LoyaltyError::StoreUnavailable { message },
        }
    }
}

impl From<std::io::Error> for LoyaltyError {
    fn from(error: std::io::Error) -> Self {
        LoyaltyError::Internal {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LoyaltyError {
    fn from(error: serde_json::Error) -> Self {
        LoyaltyError::InvalidInput {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors
impl LoyaltyError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        LoyaltyError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(doc_path: &str) -> Self {
        LoyaltyError::NotFound {
            doc_path: doc_path.to_string(),
        }
    }

    pub fn conflict(doc_path: &str, status: TransactionStatus) -> Self {
        LoyaltyError::Conflict {
            doc_path: doc_path.to_string(),
            status,
        }
    }

    pub fn retry_exhausted(key: &str, attempts: u32) -> Self {
        LoyaltyError::RetryExhausted {
            key: key.to_string(),
            attempts,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        LoyaltyError::Internal {
            message: message.into(),
        }
    }

    /// Whether the bulk processor should count this as a skip rather than an error
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            LoyaltyError::NotFound { .. } | LoyaltyError::Conflict { .. }
        )
    }
}
