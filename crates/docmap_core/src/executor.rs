//! Query execution against the document store.

use crate::codec::DocumentCodec;
use crate::error::{CoreError, CoreResult};
use crate::metadata::Registry;
use crate::query::{Bindings, CompiledQuery};
use crate::record::Record;
use docmap_document::{Document, Value};
use docmap_store::{DocumentCursor, DocumentStore, Filter};
use std::fmt;
use tracing::{debug, trace};

/// What to run.
#[derive(Debug, Clone, Copy)]
pub enum QuerySource<'q> {
    /// A translated query and its parameter values.
    Compiled {
        /// The compiled query.
        query: &'q CompiledQuery,
        /// Values for its parameters.
        bindings: &'q Bindings,
    },
    /// Native query text, passed to the store untouched.
    Native(&'q str),
    /// Every document of the result type.
    All,
}

impl fmt::Display for QuerySource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Compiled { query, .. } => f.write_str(query.source()),
            QuerySource::Native(text) => f.write_str(text),
            QuerySource::All => f.write_str("<all>"),
        }
    }
}

/// A decoded record and the document it came from.
#[derive(Debug, Clone)]
pub(crate) struct Loaded {
    pub record: Record,
    pub document: Document,
}

/// Runs queries and single-document operations through one store handle.
///
/// Each call is exactly one store operation. Results are decoded lazily as
/// they are consumed.
#[derive(Clone, Copy)]
pub struct QueryExecutor<'a> {
    registry: &'a Registry,
    store: &'a dyn DocumentStore,
}

impl fmt::Debug for QueryExecutor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("types", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor over a registry and a store.
    #[must_use]
    pub fn new(registry: &'a Registry, store: &'a dyn DocumentStore) -> Self {
        Self { registry, store }
    }

    /// Runs a query, returning records of `result_type` as a lazy sequence.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidQuery`] if a compiled query selects a
    /// different type, parameter errors from lowering, and store errors.
    /// Decode errors surface per item from the returned iterator.
    pub fn execute(&self, source: QuerySource<'_>, result_type: &str) -> CoreResult<Results<'a>> {
        let descriptor = self.registry.describe_entity(result_type)?;
        let filter = match source {
            QuerySource::Compiled { query, bindings } => {
                if query.entity_type() != result_type {
                    return Err(CoreError::invalid_query(
                        0,
                        format!(
                            "query selects {}, not {result_type}",
                            query.entity_type()
                        ),
                    ));
                }
                query.to_filter(bindings)?
            }
            QuerySource::Native(text) => Filter::Literal(text.to_string()),
            QuerySource::All => Filter::All,
        };

        let collection = descriptor.collection();
        debug!(collection, query = %source, %filter, "executing query");
        let cursor = self.store.find(collection, &filter)?;
        Ok(Results {
            cursor,
            codec: DocumentCodec::new(self.registry),
            entity_type: result_type.to_string(),
            description: source.to_string(),
        })
    }

    /// Runs a query that must match exactly one document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoResult`] or [`CoreError::NonUniqueResult`],
    /// plus everything [`QueryExecutor::execute`] returns.
    pub fn single_result(&self, source: QuerySource<'_>, result_type: &str) -> CoreResult<Record> {
        self.execute(source, result_type)?.single()
    }

    /// Loads the document with identity `id`.
    ///
    /// # Errors
    ///
    /// Returns store and decode errors.
    pub fn find_by_id(&self, entity_type: &str, id: &Value) -> CoreResult<Option<Record>> {
        Ok(self.load_by_id(entity_type, id)?.map(|loaded| loaded.record))
    }

    pub(crate) fn load_by_id(&self, entity_type: &str, id: &Value) -> CoreResult<Option<Loaded>> {
        let descriptor = self.registry.describe_entity(entity_type)?;
        let collection = descriptor.collection();
        let Some(document) = self.store.find_one(collection, &Filter::by_id(id.clone()))? else {
            trace!(collection, %id, "no document");
            return Ok(None);
        };
        let record = DocumentCodec::new(self.registry).decode(&document, entity_type)?;
        Ok(Some(Loaded { record, document }))
    }

    /// Inserts an encoded document into the collection of `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns store errors, such as a duplicate `_id`.
    pub fn insert(&self, entity_type: &str, document: Document) -> CoreResult<Value> {
        let collection = self.registry.describe_entity(entity_type)?.collection();
        trace!(collection, "insert");
        Ok(self.store.insert_one(collection, document)?)
    }

    /// Drops the collection of `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn drop_collection(&self, entity_type: &str) -> CoreResult<()> {
        let collection = self.registry.describe_entity(entity_type)?.collection();
        debug!(collection, "dropping collection");
        Ok(self.store.drop_collection(collection)?)
    }
}

/// Lazily decoded query results.
pub struct Results<'a> {
    cursor: DocumentCursor,
    codec: DocumentCodec<'a>,
    entity_type: String,
    description: String,
}

impl fmt::Debug for Results<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("entity_type", &self.entity_type)
            .field("query", &self.description)
            .finish_non_exhaustive()
    }
}

impl Results<'_> {
    pub(crate) fn next_loaded(&mut self) -> Option<CoreResult<Loaded>> {
        let document = match self.cursor.next()? {
            Ok(document) => document,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            self.codec
                .decode(&document, &self.entity_type)
                .map(|record| Loaded { record, document }),
        )
    }

    pub(crate) fn single_loaded(mut self) -> CoreResult<Loaded> {
        let first = self.next_loaded().ok_or_else(|| CoreError::NoResult {
            query: self.description.clone(),
        })??;
        if self.cursor.next().is_some() {
            return Err(CoreError::NonUniqueResult {
                query: self.description,
            });
        }
        Ok(first)
    }

    /// Consumes the results, expecting exactly one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoResult`] if empty, [`CoreError::NonUniqueResult`]
    /// if more than one document matched, or the first item's decode error.
    pub fn single(self) -> CoreResult<Record> {
        self.single_loaded().map(|loaded| loaded.record)
    }
}

impl Iterator for Results<'_> {
    type Item = CoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_loaded().map(|r| r.map(|loaded| loaded.record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityDefinition, FieldDefinition, ScalarType};
    use crate::query::translate;
    use docmap_store::InMemoryStore;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                EntityDefinition::entity("Order", "id")
                    .field(FieldDefinition::scalar("id", ScalarType::Text))
                    .field(FieldDefinition::scalar("customer", ScalarType::Text))
                    .field(FieldDefinition::list("items", "Item")),
            )
            .unwrap();
        registry
            .register(
                EntityDefinition::embeddable("Item")
                    .field(FieldDefinition::scalar("quantity", ScalarType::Integer)),
            )
            .unwrap();
        registry
    }

    fn order(id: &str, quantities: &[i64]) -> Document {
        Document::new()
            .with("_id", id)
            .with("CUSTOMER", "Tobias Trelle")
            .with(
                "ITEMS",
                quantities
                    .iter()
                    .map(|q| Value::from(Document::new().with("QUANTITY", *q)))
                    .collect::<Vec<_>>(),
            )
    }

    fn store() -> InMemoryStore {
        InMemoryStore::with_documents("ORDER", vec![order("o-1", &[1, 2]), order("o-2", &[3])])
    }

    #[test]
    fn compiled_query_returns_matching_records() {
        let registry = registry();
        let store = store();
        let executor = QueryExecutor::new(&registry, &store);
        let query = translate("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2", &registry).unwrap();

        let records: Vec<Record> = executor
            .execute(
                QuerySource::Compiled {
                    query: &query,
                    bindings: &Bindings::new(),
                },
                "Order",
            )
            .unwrap()
            .collect::<CoreResult<_>>()
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("id").unwrap(), "o-1");
        assert_eq!(records[0].list("items").unwrap().len(), 2);
    }

    #[test]
    fn single_result_errors() {
        let registry = registry();
        let store = store();
        let executor = QueryExecutor::new(&registry, &store);

        assert!(matches!(
            executor.single_result(QuerySource::All, "Order"),
            Err(CoreError::NonUniqueResult { .. })
        ));
        assert!(matches!(
            executor.single_result(QuerySource::Native("{CUSTOMER: 'nobody'}"), "Order"),
            Err(CoreError::NoResult { .. })
        ));
    }

    #[test]
    fn native_query_is_passed_through() {
        let registry = registry();
        let store = store();
        let executor = QueryExecutor::new(&registry, &store);

        let record = executor
            .single_result(QuerySource::Native(r#"db.ORDER.findOne({_id: "o-2"})"#), "Order")
            .unwrap();
        assert_eq!(record.text("id").unwrap(), "o-2");

        assert!(matches!(
            executor.execute(QuerySource::Native("db.ORDER.remove({})"), "Order"),
            Err(CoreError::Store(_))
        ));
    }

    #[test]
    fn result_type_must_match_query() {
        let registry = registry();
        let store = store();
        let executor = QueryExecutor::new(&registry, &store);
        let query = translate("SELECT o FROM Order o", &registry).unwrap();

        let result = executor.execute(
            QuerySource::Compiled {
                query: &query,
                bindings: &Bindings::new(),
            },
            "Item",
        );
        assert!(result.is_err());
    }

    #[test]
    fn decode_errors_surface_per_item() {
        let registry = registry();
        let store = InMemoryStore::with_documents(
            "ORDER",
            vec![order("o-1", &[1]), Document::new().with("_id", "broken")],
        );
        let executor = QueryExecutor::new(&registry, &store);

        let mut results = executor.execute(QuerySource::All, "Order").unwrap();
        assert!(results.next().unwrap().is_ok());
        assert!(matches!(
            results.next().unwrap(),
            Err(CoreError::SchemaMismatch { .. })
        ));
        assert!(results.next().is_none());
    }

    #[test]
    fn find_insert_and_drop() {
        let registry = registry();
        let store = InMemoryStore::new();
        let executor = QueryExecutor::new(&registry, &store);

        let id = executor.insert("Order", order("o-9", &[])).unwrap();
        assert_eq!(id, Value::from("o-9"));
        assert!(executor.find_by_id("Order", &id).unwrap().is_some());
        assert!(executor.find_by_id("Order", &Value::from("nope")).unwrap().is_none());

        executor.drop_collection("Order").unwrap();
        assert_eq!(store.count("ORDER"), 0);
    }
}
