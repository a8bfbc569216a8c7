//! Mapper facade.

use crate::codec::DocumentCodec;
use crate::config::MapperConfig;
use crate::error::CoreResult;
use crate::executor::QueryExecutor;
use crate::id::IdGenerator;
use crate::metadata::{EntityDefinition, KeyMapper, Registry};
use crate::query::{translate, CacheStats, CompiledQuery, Criteria, QueryCache};
use crate::session::Session;
use docmap_store::{DocumentStore, InMemoryStore};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

struct MapperInner {
    config: MapperConfig,
    registry: Registry,
    store: Arc<dyn DocumentStore>,
    ids: Arc<dyn IdGenerator>,
    cache: QueryCache,
}

/// The main mapper handle.
///
/// A `Mapper` owns the registry, the document store handle, the identity
/// generator and the compiled query cache. It is cheap to clone and safe to
/// share across threads; each thread opens its own [`Session`].
///
/// # Building a Mapper
///
/// ```rust
/// use docmap_core::{EntityDefinition, FieldDefinition, Mapper, MapperConfig, ScalarType};
/// use docmap_store::InMemoryStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::new());
/// let mapper = Mapper::builder()
///     .config(MapperConfig::new().query_cache_capacity(64))
///     .entity(
///         EntityDefinition::entity("Order", "id")
///             .field(FieldDefinition::scalar("id", ScalarType::Text))
///             .field(FieldDefinition::list("items", "Item")),
///     )
///     .entity(
///         EntityDefinition::embeddable("Item")
///             .field(FieldDefinition::scalar("quantity", ScalarType::Integer)),
///     )
///     .store(store)
///     .build()
///     .unwrap();
///
/// assert!(mapper.registry().contains("Order"));
/// ```
#[derive(Clone)]
pub struct Mapper {
    inner: Arc<MapperInner>,
}

impl Mapper {
    /// Starts building a mapper.
    #[must_use]
    pub fn builder() -> MapperBuilder {
        MapperBuilder::new()
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.inner.config
    }

    /// Returns a codec over the registry.
    #[must_use]
    pub fn codec(&self) -> DocumentCodec<'_> {
        DocumentCodec::new(&self.inner.registry)
    }

    /// Returns an executor over the registry and store.
    #[must_use]
    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.inner.registry, self.inner.store.as_ref())
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.ids.as_ref()
    }

    /// Translates query text, reusing a cached translation when the same
    /// text was compiled before.
    ///
    /// # Errors
    ///
    /// Returns translation errors; see [`crate::translate`].
    pub fn compile(&self, text: &str) -> CoreResult<Arc<CompiledQuery>> {
        self.inner
            .cache
            .get_or_compile(text, || translate(text, &self.inner.registry))
    }

    /// Compiles criteria, cached by their rendered query text.
    ///
    /// # Errors
    ///
    /// Returns translation errors.
    pub fn compile_criteria(&self, criteria: &Criteria) -> CoreResult<Arc<CompiledQuery>> {
        let text = criteria.to_string();
        self.inner
            .cache
            .get_or_compile(&text, || criteria.compile(&self.inner.registry))
    }

    /// Returns the query cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Opens a new session.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    /// Runs `f` in a new session with an active transaction.
    ///
    /// Commits if `f` succeeds. If `f` fails the session is closed and its
    /// pending writes are discarded.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` or from the commit.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Session) -> CoreResult<T>,
    {
        let mut session = self.session();
        session.begin()?;
        match f(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(e) => {
                session.close()?;
                Err(e)
            }
        }
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.inner.config)
            .field("types", &self.inner.registry.type_names())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Mapper`].
///
/// Definitions are registered when [`MapperBuilder::build`] runs, so the
/// configured key case applies regardless of call order.
#[derive(Default)]
pub struct MapperBuilder {
    config: MapperConfig,
    definitions: Vec<(EntityDefinition, Option<Box<dyn KeyMapper>>)>,
    store: Option<Arc<dyn DocumentStore>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl MapperBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a type definition.
    #[must_use]
    pub fn entity(mut self, definition: EntityDefinition) -> Self {
        self.definitions.push((definition, None));
        self
    }

    /// Adds a type definition named by a custom key mapper.
    #[must_use]
    pub fn entity_with_mapper(
        mut self,
        definition: EntityDefinition,
        mapper: impl KeyMapper + 'static,
    ) -> Self {
        self.definitions.push((definition, Some(Box::new(mapper))));
        self
    }

    /// Sets the document store. Defaults to a fresh [`InMemoryStore`].
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Overrides the identity generator chosen by the configuration.
    #[must_use]
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Registers every definition and builds the mapper.
    ///
    /// # Errors
    ///
    /// Returns registration errors, or [`crate::CoreError::InvalidDefinition`] if an
    /// embedded field names a type that was never registered.
    pub fn build(self) -> CoreResult<Mapper> {
        let mut registry = Registry::with_key_case(self.config.key_case);
        for (definition, mapper) in self.definitions {
            match mapper {
                Some(mapper) => registry.register_with_mapper(definition, mapper.as_ref())?,
                None => registry.register(definition)?,
            };
        }
        registry.validate()?;

        let store: Arc<dyn DocumentStore> = match self.store {
            Some(store) => store,
            None => {
                debug!("no document store configured; using an in-memory store");
                Arc::new(InMemoryStore::new())
            }
        };
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::from(self.config.id_strategy.generator()));

        info!(
            types = registry.len(),
            id_strategy = ?self.config.id_strategy,
            "mapper ready"
        );
        Ok(Mapper {
            inner: Arc::new(MapperInner {
                cache: QueryCache::new(self.config.query_cache_capacity),
                config: self.config,
                registry,
                store,
                ids,
            }),
        })
    }
}

impl fmt::Debug for MapperBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperBuilder")
            .field("config", &self.config)
            .field("definitions", &self.definitions.len())
            .finish_non_exhaustive()
    }
}
