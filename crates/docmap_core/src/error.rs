//! Error types for docmap core.

use docmap_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in docmap core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No descriptor is registered for the type.
    #[error("unknown entity type: {type_name}")]
    UnknownType {
        /// The requested type name.
        type_name: String,
    },

    /// A descriptor for the type is already registered.
    #[error("entity type already registered: {type_name}")]
    DuplicateRegistration {
        /// The type name registered twice.
        type_name: String,
    },

    /// A definition was rejected at registration time.
    #[error("invalid definition for {type_name}: {message}")]
    InvalidDefinition {
        /// The type being registered.
        type_name: String,
        /// Why it was rejected.
        message: String,
    },

    /// A record or document does not fit its descriptor.
    #[error("schema mismatch on {entity_type}.{field}: {message}")]
    SchemaMismatch {
        /// The entity type being encoded or decoded.
        entity_type: String,
        /// The offending field.
        field: String,
        /// What did not fit.
        message: String,
    },

    /// A stored value cannot be converted to the field's type without loss.
    #[error("cannot convert {value} to {target} for {entity_type}.{field}")]
    TypeCoercion {
        /// The entity type being decoded.
        entity_type: String,
        /// The offending field.
        field: String,
        /// The stored value, rendered.
        value: String,
        /// The declared field type.
        target: String,
    },

    /// A query path names a field the entity does not declare.
    #[error("unknown field {field} on {entity_type}")]
    UnknownField {
        /// The type that was navigated.
        entity_type: String,
        /// The missing field.
        field: String,
    },

    /// A query path reaches further into embedded sequences than the translator supports.
    #[error("unsupported path {path}: {reason}")]
    UnsupportedPath {
        /// The path as written in the query.
        path: String,
        /// Why it cannot be translated.
        reason: String,
    },

    /// Query text or structure is invalid.
    #[error("invalid query at offset {offset}: {message}")]
    InvalidQuery {
        /// Byte offset into the query text.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// A `:name` parameter had no bound value at execution.
    #[error("parameter :{name} is not bound")]
    UnboundParameter {
        /// The parameter name without the colon.
        name: String,
    },

    /// A single-result query matched nothing.
    #[error("query returned no result: {query}")]
    NoResult {
        /// The query, rendered.
        query: String,
    },

    /// A single-result query matched more than one document.
    #[error("query returned more than one result: {query}")]
    NonUniqueResult {
        /// The query, rendered.
        query: String,
    },

    /// One or more pending writes failed during flush.
    #[error(transparent)]
    Flush(#[from] FlushError),

    /// The session is closed.
    #[error("session is closed")]
    SessionClosed,

    /// The operation needs an active transaction.
    #[error("{operation} requires an active transaction")]
    TransactionRequired {
        /// The rejected operation.
        operation: &'static str,
    },

    /// An entity with the same identity is already managed by the session.
    #[error("entity {entity_type}({id}) is already managed by this session")]
    EntityExists {
        /// The entity type.
        entity_type: String,
        /// The identity, rendered.
        id: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Creates an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Creates an invalid definition error.
    pub fn invalid_definition(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates a schema mismatch error.
    pub fn schema_mismatch(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            entity_type: entity_type.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            offset,
            message: message.into(),
        }
    }

    /// Creates an unsupported path error.
    pub fn unsupported_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

/// One pending write that failed during flush.
#[derive(Debug)]
pub struct FlushFailure {
    /// The entity type.
    pub entity_type: String,
    /// The entity's identity, rendered.
    pub id: String,
    /// Why the write failed.
    pub error: Box<CoreError>,
}

/// Aggregate of the writes that failed during one flush.
///
/// Writes that succeeded before or after a failure stay written; the
/// failures listed here remain pending in the session.
#[derive(Debug)]
pub struct FlushError {
    failures: Vec<FlushFailure>,
}

impl FlushError {
    pub(crate) fn new(failures: Vec<FlushFailure>) -> Self {
        Self { failures }
    }

    /// Returns the failed writes in flush order.
    #[must_use]
    pub fn failures(&self) -> &[FlushFailure] {
        &self.failures
    }

    /// Returns the number of failed writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for FlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flush failed for {} write(s)", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(
                f,
                "{sep}{}({}): {}",
                failure.entity_type, failure.id, failure.error
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for FlushError {}
