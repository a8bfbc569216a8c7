//! In-memory document store.

use crate::error::{StoreError, StoreResult};
use crate::filter::matches_filter;
use crate::shell::{parse_shell_query, ShellMethod};
use crate::store::{DocumentCursor, DocumentStore, Filter};
use crate::ID_KEY;
use docmap_document::{Document, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// An in-memory document store.
///
/// This store keeps every collection in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Tooling that loads documents from files
///
/// It enforces unique `_id` values per collection, assigns a hex `_id` to
/// documents inserted without one, and evaluates native filters and
/// shell-style literal queries (see [`crate::parse_shell_query`]).
///
/// # Thread Safety
///
/// The store is thread-safe and can be shared across sessions.
///
/// # Example
///
/// ```rust
/// use docmap_document::Document;
/// use docmap_store::{DocumentStore, Filter, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.insert_one("ORDER", Document::new().with("_id", "o-1")).unwrap();
/// let found = store.find_one("ORDER", &Filter::by_id("o-1")).unwrap();
/// assert!(found.is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing documents in one collection.
    ///
    /// Documents are inserted as-is; `_id` uniqueness is not checked.
    #[must_use]
    pub fn with_documents(collection: impl Into<String>, documents: Vec<Document>) -> Self {
        let store = Self::new();
        store.collections.write().insert(collection.into(), documents);
        store
    }

    /// Returns the number of documents in a collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Returns a copy of every document in a collection.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the names of the collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn generate_id(&self) -> Value {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        Value::Text(format!("{n:024x}"))
    }

    /// Resolves a filter to a native filter document plus an optional result limit.
    fn resolve(&self, collection: &str, filter: &Filter) -> StoreResult<(Document, Option<usize>)> {
        match filter {
            Filter::All => Ok((Document::new(), None)),
            Filter::Native(doc) => Ok((doc.clone(), None)),
            Filter::Literal(text) => {
                let query = parse_shell_query(text)?;
                if let Some(named) = &query.collection {
                    if named != collection {
                        return Err(StoreError::CollectionMismatch {
                            expected: collection.to_string(),
                            found: named.clone(),
                        });
                    }
                }
                let limit = match query.method {
                    ShellMethod::FindOne => Some(1),
                    ShellMethod::Find => None,
                };
                Ok((query.filter, limit))
            }
        }
    }

    fn select(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let (native, limit) = self.resolve(collection, filter)?;
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut selected = Vec::new();
        for doc in documents {
            if limit.is_some_and(|l| selected.len() >= l) {
                break;
            }
            if matches_filter(doc, &native)? {
                selected.push(doc.clone());
            }
        }
        trace!(collection, %filter, matched = selected.len(), "in-memory select");
        Ok(selected)
    }
}

impl DocumentStore for InMemoryStore {
    fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<Value> {
        let id = match document.get(ID_KEY) {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                let id = self.generate_id();
                document.insert(ID_KEY, id.clone());
                id
            }
        };

        let mut collections = self.collections.write();
        let documents = collections.entry(collection.to_string()).or_default();
        if documents
            .iter()
            .any(|existing| existing.get(ID_KEY).is_some_and(|v| v.matches(&id)))
        {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                key: id.to_string(),
            });
        }
        documents.push(document);
        Ok(id)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let (native, _) = self.resolve(collection, filter)?;
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };
        for doc in documents {
            if matches_filter(doc, &native)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<DocumentCursor> {
        let selected = self.select(collection, filter)?;
        Ok(Box::new(selected.into_iter().map(Ok)))
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.collections.write().remove(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, quantity: i64) -> Document {
        Document::new().with("_id", id).with(
            "ITEMS",
            vec![Value::from(Document::new().with("QUANTITY", quantity))],
        )
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert_eq!(store.count("ORDER"), 0);
        assert!(store.collection_names().is_empty());
    }

    #[test]
    fn insert_then_find_by_id() {
        let store = InMemoryStore::new();
        let id = store.insert_one("ORDER", order("o-1", 2)).unwrap();
        assert_eq!(id, Value::Text("o-1".into()));

        let found = store.find_one("ORDER", &Filter::by_id("o-1")).unwrap();
        assert_eq!(found, Some(order("o-1", 2)));
    }

    #[test]
    fn insert_assigns_missing_id() {
        let store = InMemoryStore::new();
        let id = store.insert_one("ORDER", Document::new().with("CUSTOMER", "x")).unwrap();

        let stored = store.documents("ORDER");
        assert_eq!(stored[0].get("_id"), Some(&id));
        assert_eq!(id.as_text().map(str::len), Some(24));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_one("ORDER", order("o-1", 1)).unwrap();

        let result = store.insert_one("ORDER", order("o-1", 2));

        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
        assert_eq!(store.count("ORDER"), 1);
    }

    #[test]
    fn same_id_in_other_collection_is_fine() {
        let store = InMemoryStore::new();
        store.insert_one("ORDER", order("o-1", 1)).unwrap();
        assert!(store.insert_one("INVOICE", order("o-1", 1)).is_ok());
    }

    #[test]
    fn find_with_native_filter() {
        let store = InMemoryStore::new();
        store.insert_one("ORDER", order("o-1", 1)).unwrap();
        store.insert_one("ORDER", order("o-2", 2)).unwrap();

        let filter = Filter::Native(Document::new().with("ITEMS.QUANTITY", 2));
        let found: Vec<_> = store
            .find("ORDER", &filter)
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();

        assert_eq!(found, vec![order("o-2", 2)]);
    }

    #[test]
    fn literal_find_one_limits_to_first_match() {
        let store = InMemoryStore::new();
        store.insert_one("ORDER", order("o-1", 2)).unwrap();
        store.insert_one("ORDER", order("o-2", 2)).unwrap();

        let filter = Filter::Literal(r#"db.ORDER.findOne({"ITEMS.QUANTITY": 2})"#.into());
        let found: Vec<_> = store.find("ORDER", &filter).unwrap().collect();
        assert_eq!(found.len(), 1);

        let filter = Filter::Literal(r#"db.ORDER.find({"ITEMS.QUANTITY": 2})"#.into());
        assert_eq!(store.find("ORDER", &filter).unwrap().count(), 2);
    }

    #[test]
    fn literal_for_other_collection_is_rejected() {
        let store = InMemoryStore::new();
        let filter = Filter::Literal("db.INVOICE.find({})".into());

        let result = store.find("ORDER", &filter);

        assert!(matches!(
            result.err(),
            Some(StoreError::CollectionMismatch { .. })
        ));
    }

    #[test]
    fn drop_collection_removes_documents() {
        let store = InMemoryStore::new();
        store.insert_one("ORDER", order("o-1", 1)).unwrap();

        store.drop_collection("ORDER").unwrap();
        store.drop_collection("MISSING").unwrap();

        assert_eq!(store.count("ORDER"), 0);
        assert!(store.find_one("ORDER", &Filter::All).unwrap().is_none());
    }

    #[test]
    fn with_documents_preloads() {
        let store = InMemoryStore::with_documents("ORDER", vec![order("o-1", 1)]);
        assert_eq!(store.count("ORDER"), 1);
        assert_eq!(store.collection_names(), vec!["ORDER".to_string()]);
    }
}
