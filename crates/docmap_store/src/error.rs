//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A document with the same `_id` already exists in the collection.
    #[error("duplicate key {key} in collection {collection}")]
    DuplicateKey {
        /// The collection written to.
        collection: String,
        /// Rendered `_id` value.
        key: String,
    },

    /// A native query addressed a different collection than the handle.
    #[error("native query targets collection {found}, expected {expected}")]
    CollectionMismatch {
        /// The collection the caller asked for.
        expected: String,
        /// The collection named in the query text.
        found: String,
    },

    /// Native query text could not be read.
    #[error("invalid native query at offset {offset}: {message}")]
    InvalidNativeQuery {
        /// Byte offset of the problem in the query text.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// A filter used an operator the store does not evaluate.
    #[error("unsupported filter operator: {operator}")]
    UnsupportedOperator {
        /// The operator, including its `$` prefix.
        operator: String,
    },

    /// The store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Creates an invalid native query error.
    pub fn invalid_native_query(offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidNativeQuery {
            offset,
            message: message.into(),
        }
    }

    /// Creates an unsupported operator error.
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }
}
