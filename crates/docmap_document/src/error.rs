//! Error types for the document crate.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while building or converting documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A document was expected but another kind of value was found.
    #[error("expected a document, found {found}")]
    NotADocument {
        /// Kind of the value that was found.
        found: String,
    },

    /// A JSON number cannot be represented without loss.
    #[error("number {number} cannot be represented as an integer or float")]
    UnrepresentableNumber {
        /// Textual form of the number.
        number: String,
    },

    /// JSON text could not be parsed.
    #[error("invalid JSON: {message}")]
    InvalidJson {
        /// Description of the parse error.
        message: String,
    },
}

impl DocumentError {
    /// Create a not-a-document error.
    pub fn not_a_document(found: impl Into<String>) -> Self {
        Self::NotADocument {
            found: found.into(),
        }
    }

    /// Create an invalid JSON error.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }
}
