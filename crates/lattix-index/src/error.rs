//! Index error types.

use thiserror::Error;

/// Errors raised by index maintenance and search operations.
///
/// Unknown ids and absent keys are not errors (lookups return `None` or an
/// empty result); the variants here are the hard failures of §maintenance:
/// constraint violations, unsupported operations, and misdirected queries.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index registered under this name
    #[error("index '{index}' not found")]
    IndexNotFound { index: String },

    /// A query was issued against an index of a different kind
    #[error("index '{index}' is not a {expected} index")]
    WrongIndexKind {
        index: String,
        expected: &'static str,
    },

    /// Unique composite key collision
    #[error("unique constraint violated on index '{index}' for key '{key}'")]
    ConstraintViolation { index: String, key: String },

    /// The operation is not implemented for this index kind; callers must
    /// rebuild instead
    #[error("operation '{operation}' is unsupported on index '{index}'; rebuild the index instead")]
    MaintenanceUnsupported { index: String, operation: String },

    /// The caller-supplied node data provider failed during a rebuild
    #[error("node data provider failed: {message}")]
    Provider { message: String },
}

impl IndexError {
    /// Create a ConstraintViolation error
    pub fn constraint_violation(index: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            index: index.into(),
            key: key.into(),
        }
    }

    /// Create a Provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}
