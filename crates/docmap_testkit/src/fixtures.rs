//! Test fixtures and mapper helpers.
//!
//! Provides the type definitions of the test models, mappers backed by an
//! inspectable in-memory store, and on-disk schema and data files.

use crate::model::{Item, Order};
use docmap_core::{
    CoreResult, EntityDefinition, FieldDefinition, Mapper, MapperBuilder, MapperConfig, ScalarType,
};
use docmap_document::{Document, Value};
use docmap_store::{DocumentStore, InMemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Collection the `Order` fixtures live in.
pub const ORDER_COLLECTION: &str = "ORDER";

/// The query the mapping tests revolve around.
pub const ITEMS_QUANTITY_QUERY: &str = "SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2";

/// Definitions of `Order` and its embedded `Item`.
pub fn order_definitions() -> Vec<EntityDefinition> {
    vec![
        EntityDefinition::entity("Order", "id")
            .field(FieldDefinition::scalar("id", ScalarType::Text))
            .field(FieldDefinition::scalar("customer", ScalarType::Text))
            .field(FieldDefinition::list("items", "Item")),
        EntityDefinition::embeddable("Item")
            .field(FieldDefinition::scalar("quantity", ScalarType::Integer))
            .field(FieldDefinition::scalar("price", ScalarType::Float))
            .field(FieldDefinition::scalar("description", ScalarType::Text)),
    ]
}

/// Definitions of a nested `Shipment` model.
///
/// A shipment embeds a list of parts; each part embeds its dimensions and a
/// list of components. `s.parts` followed by one scalar is translatable;
/// anything deeper is not.
pub fn shipment_definitions() -> Vec<EntityDefinition> {
    vec![
        EntityDefinition::entity("Shipment", "id")
            .field(FieldDefinition::scalar("id", ScalarType::Integer))
            .field(FieldDefinition::scalar("carrier", ScalarType::Text))
            .field(FieldDefinition::embedded("destination", "Address").optional())
            .field(FieldDefinition::list("parts", "Part")),
        EntityDefinition::embeddable("Address")
            .field(FieldDefinition::scalar("city", ScalarType::Text)),
        EntityDefinition::embeddable("Part")
            .field(FieldDefinition::scalar("sku", ScalarType::Text))
            .field(FieldDefinition::scalar("weight", ScalarType::Float))
            .field(FieldDefinition::embedded("dimensions", "Dimensions").optional())
            .field(FieldDefinition::list("components", "Component").optional()),
        EntityDefinition::embeddable("Dimensions")
            .field(FieldDefinition::scalar("width", ScalarType::Integer)),
        EntityDefinition::embeddable("Component")
            .field(FieldDefinition::scalar("name", ScalarType::Text)),
    ]
}

/// Every fixture definition.
pub fn all_definitions() -> Vec<EntityDefinition> {
    let mut definitions = order_definitions();
    definitions.extend(shipment_definitions());
    definitions
}

/// A builder with every fixture type registered.
pub fn mapper_builder() -> MapperBuilder {
    all_definitions()
        .into_iter()
        .fold(Mapper::builder(), MapperBuilder::entity)
}

/// The order persisted before each mapping test: two items, one of them
/// with quantity 2.
pub fn sample_order() -> Order {
    Order::new("Tobias Trelle").with_items(vec![
        Item::new(1, 47.11, "Item #1"),
        Item::new(2, 42.0, "Item #2"),
    ])
}

/// A mapper over an in-memory store the test can inspect directly.
pub struct TestMapper {
    /// The mapper under test.
    pub mapper: Mapper,
    /// The store behind the mapper.
    pub store: Arc<InMemoryStore>,
}

impl TestMapper {
    /// Creates a mapper with default configuration and every fixture type.
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    /// Creates a mapper with the given configuration.
    pub fn with_config(config: MapperConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mapper = mapper_builder()
            .config(config)
            .store(Arc::clone(&store) as Arc<dyn DocumentStore>)
            .build()
            .expect("fixture definitions are valid");
        Self { mapper, store }
    }

    /// Drops the order collection, persists [`sample_order`] and flushes it
    /// in one transaction. Returns the assigned identity.
    pub fn seed_sample_order(&self) -> String {
        self.mapper
            .transaction(|session| {
                session.drop_collection::<Order>()?;
                let mut order = sample_order();
                session.persist(&mut order)?;
                session.flush()?;
                Ok(order.id.clone())
            })
            .expect("seeding the sample order")
            .expect("persist assigns an identity")
    }

    /// Persists `orders` in one transaction and returns their identities.
    pub fn seed_orders(&self, orders: Vec<Order>) -> CoreResult<Vec<Value>> {
        self.mapper.transaction(|session| {
            orders
                .into_iter()
                .map(|mut order| session.persist(&mut order))
                .collect()
        })
    }

    /// Returns the stored order documents.
    pub fn order_documents(&self) -> Vec<Document> {
        self.store.documents(ORDER_COLLECTION)
    }
}

impl Default for TestMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestMapper {
    type Target = Mapper;

    fn deref(&self) -> &Self::Target {
        &self.mapper
    }
}

/// Runs a test against a fresh mapper seeded with [`sample_order`].
///
/// # Example
///
/// ```rust
/// use docmap_testkit::{with_seeded_mapper, Order};
///
/// with_seeded_mapper(|fixture, id| {
///     let mut session = fixture.mapper.session();
///     let order: Option<Order> = session.find(id).unwrap();
///     assert!(order.is_some());
/// });
/// ```
pub fn with_seeded_mapper<F, R>(f: F) -> R
where
    F: FnOnce(&TestMapper, &str) -> R,
{
    let fixture = TestMapper::new();
    let id = fixture.seed_sample_order();
    f(&fixture, &id)
}

/// A schema file and a data file in a temporary directory.
///
/// The schema is a JSON array of entity definitions; the data file is a
/// JSON object mapping collection names to arrays of stored documents.
pub struct FixtureFiles {
    dir: TempDir,
}

impl FixtureFiles {
    /// Writes every fixture definition and the seeded sample order.
    pub fn sample() -> Self {
        let fixture = TestMapper::new();
        fixture.seed_sample_order();

        let dir = TempDir::new().expect("Failed to create temp directory");
        let schema = serde_json::to_string_pretty(&all_definitions()).expect("definitions serialize");
        std::fs::write(dir.path().join("schema.json"), schema).expect("Failed to write schema");

        let data = Document::new().with(
            ORDER_COLLECTION,
            fixture
                .order_documents()
                .into_iter()
                .map(Value::Document)
                .collect::<Vec<_>>(),
        );
        std::fs::write(dir.path().join("data.json"), data.to_json_pretty())
            .expect("Failed to write data");

        Self { dir }
    }

    /// Directory holding the files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the schema file.
    pub fn schema_path(&self) -> PathBuf {
        self.dir.path().join("schema.json")
    }

    /// Path of the data file.
    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("data.json")
    }
}
