//! Error types for virology workflow operations.

use thiserror::Error;

/// Result type alias for virology operations.
pub type Result<T> = std::result::Result<T, VirologyError>;

/// Errors that can occur during virology workflow operations.
///
/// Token collisions are deliberately absent: a collision is an expected,
/// retryable outcome of order creation and is reported through
/// [`crate::persistence::CreateOrderOutcome`], never as an error. Only
/// exhausting the retry budget is an error, and an operational one.
#[derive(Debug, Error)]
pub enum VirologyError {
    /// Storage operation failed (infrastructure fault; surfaced, not retried).
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Order creation exhausted its collision-retry budget.
    ///
    /// Every attempt used a freshly generated token triple, so hitting this
    /// signals either a saturated token space or a misbehaving store, not
    /// bad user input.
    #[error("order creation failed after {attempts} token persistence attempts")]
    TokenPersistenceExhausted {
        /// Number of distinct token triples attempted.
        attempts: u32,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl VirologyError {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
