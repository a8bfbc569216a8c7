//! Document store trait definition.

use crate::error::StoreResult;
use docmap_document::{Document, Value};
use std::fmt;

/// A lazily consumed sequence of documents returned by [`DocumentStore::find`].
pub type DocumentCursor = Box<dyn Iterator<Item = StoreResult<Document>> + Send>;

/// Selects documents in a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// A filter document in the store's native form, e.g. `{"ITEMS.QUANTITY": 2}`.
    Native(Document),
    /// Native query text passed through verbatim, e.g. `db.ORDER.findOne({_id: "x"})`.
    ///
    /// The store is the only component that interprets this text.
    Literal(String),
}

impl Filter {
    /// Filter matching a single `_id`.
    pub fn by_id(id: impl Into<Value>) -> Self {
        Filter::Native(Document::new().with(crate::ID_KEY, id))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("{}"),
            Filter::Native(doc) => write!(f, "{doc}"),
            Filter::Literal(text) => f.write_str(text),
        }
    }
}

/// A document store the mapper writes to and reads from.
///
/// This is the injected collaborator: connection handling, pooling, retries
/// and timeouts are the implementor's concern. Each method is exactly one
/// store operation.
///
/// # Invariants
///
/// - `insert_one` stores the document under its `_id`, assigning one if absent,
///   and returns the `_id`
/// - `find_one` and `find` never return documents from other collections
/// - Implementors must be `Send + Sync`; sessions on different threads share one store
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - reference store for tests and tooling
pub trait DocumentStore: Send + Sync {
    /// Inserts one document into `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if a document with the same `_id` exists or the
    /// store fails.
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Value>;

    /// Returns the first document matching `filter`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated or the store fails.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Returns every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be evaluated or the store fails.
    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<DocumentCursor>;

    /// Drops `collection` and every document in it.
    ///
    /// Dropping a missing collection is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    fn drop_collection(&self, collection: &str) -> StoreResult<()>;
}
