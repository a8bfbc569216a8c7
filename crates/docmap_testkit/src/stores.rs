//! Store wrappers for failure-path tests.

use docmap_document::{Document, Value};
use docmap_store::{
    DocumentCursor, DocumentStore, Filter, InMemoryStore, StoreError, StoreResult, ID_KEY,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A store that delegates to an [`InMemoryStore`] but fails selected operations.
///
/// Inserts of documents whose `_id` was registered with
/// [`FailingStore::fail_insert_of`] fail with [`StoreError::Unavailable`]
/// and write nothing. Reads can be switched off wholesale.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: Arc<InMemoryStore>,
    failing_ids: Mutex<Vec<Value>>,
    reads_unavailable: AtomicBool,
    operations: AtomicUsize,
}

impl FailingStore {
    /// Wraps a fresh in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing in-memory store.
    pub fn wrapping(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Makes inserts of the document with this `_id` fail.
    pub fn fail_insert_of(&self, id: impl Into<Value>) {
        self.failing_ids.lock().push(id.into());
    }

    /// Makes every later insert succeed again.
    pub fn heal(&self) {
        self.failing_ids.lock().clear();
        self.reads_unavailable.store(false, Ordering::SeqCst);
    }

    /// Makes `find_one` and `find` fail.
    pub fn fail_reads(&self) {
        self.reads_unavailable.store(true, Ordering::SeqCst);
    }

    /// Number of store operations issued through this wrapper.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    fn check_reads(&self, collection: &str) -> StoreResult<()> {
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("reads from {collection} are switched off")));
        }
        Ok(())
    }
}

impl DocumentStore for FailingStore {
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Value> {
        self.count();
        let rejected = document
            .get(ID_KEY)
            .is_some_and(|id| self.failing_ids.lock().iter().any(|f| f.matches(id)));
        if rejected {
            return Err(StoreError::Unavailable(format!("insert into {collection} rejected")));
        }
        self.inner.insert_one(collection, document)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        self.count();
        self.check_reads(collection)?;
        self.inner.find_one(collection, filter)
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<DocumentCursor> {
        self.count();
        self.check_reads(collection)?;
        self.inner.find(collection, filter)
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.count();
        self.inner.drop_collection(collection)
    }
}
