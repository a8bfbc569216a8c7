//! The session: a unit of work over one mapper.

use super::query::{QueryKind, TypedQuery};
use super::state::SessionState;
use super::working::WorkingSet;
use crate::codec::is_unset_identity;
use crate::error::{CoreError, CoreResult, FlushError, FlushFailure};
use crate::executor::{Loaded, QuerySource};
use crate::id::IdentityKey;
use crate::mapper::Mapper;
use crate::metadata::ScalarType;
use crate::query::{Bindings, Criteria};
use crate::record::{Entity, FieldValue, Record};
use docmap_document::{Document, Value};
use tracing::{debug, trace, warn};

/// A unit of work.
///
/// A session tracks the entities it has persisted or read, keyed by type and
/// identity, and writes pending entities to the store on [`Session::flush`].
/// Within one session an identity maps to one managed instance: reading an
/// entity that is already managed returns the managed copy.
///
/// Sessions are not atomic. A flush writes pending entities one at a time
/// and writes that succeeded stay written when a later one fails.
///
/// # Example
///
/// ```rust
/// use docmap_core::{EntityDefinition, FieldDefinition, Mapper, Record, ScalarType};
///
/// let mapper = Mapper::builder()
///     .entity(
///         EntityDefinition::entity("Order", "id")
///             .field(FieldDefinition::scalar("id", ScalarType::Text))
///             .field(FieldDefinition::scalar("customer", ScalarType::Text)),
///     )
///     .build()
///     .unwrap();
///
/// let mut session = mapper.session();
/// session.begin().unwrap();
/// let mut order = Record::new("Order").with("customer", "Tobias Trelle");
/// let id = session.persist_record(&mut order).unwrap();
/// session.commit().unwrap();
///
/// let mut session = mapper.session();
/// let found = session.find_record("Order", id).unwrap().unwrap();
/// assert_eq!(found.text("customer").unwrap(), "Tobias Trelle");
/// ```
#[derive(Debug)]
pub struct Session {
    mapper: Mapper,
    state: SessionState,
    working: WorkingSet,
}

impl Session {
    pub(crate) fn new(mapper: Mapper) -> Self {
        Self {
            mapper,
            state: SessionState::Inactive,
            working: WorkingSet::default(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Checks if a transaction is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Returns the number of managed entities.
    #[must_use]
    pub fn managed_count(&self) -> usize {
        self.working.len()
    }

    /// Returns the number of persisted entities not yet flushed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.working.pending_count()
    }

    /// Returns the mapper this session belongs to.
    #[must_use]
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Returns the document last written or read for a managed entity.
    ///
    /// `None` if the entity is not managed, or is persisted but not yet flushed.
    #[must_use]
    pub fn snapshot(&self, entity_type: &str, id: &Value) -> Option<&Document> {
        let key = IdentityKey::from_value(entity_type, id).ok()?;
        self.working.get(entity_type, &key)?.snapshot.as_ref()
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if one is already active, or
    /// [`CoreError::SessionClosed`].
    pub fn begin(&mut self) -> CoreResult<()> {
        match self.state {
            SessionState::Inactive => {
                self.state = SessionState::Active;
                debug!("session transaction started");
                Ok(())
            }
            SessionState::Active => Err(CoreError::invalid_operation("transaction already active")),
            SessionState::Closed => Err(CoreError::SessionClosed),
        }
    }

    /// Manages a typed entity for insertion at the next flush.
    ///
    /// If the entity has no identity one is generated and written back into
    /// `entity`. Returns the identity.
    ///
    /// # Errors
    ///
    /// Same as [`Session::persist_record`], plus conversion errors from the
    /// entity's [`Entity`] implementation.
    pub fn persist<T: Entity>(&mut self, entity: &mut T) -> CoreResult<Value> {
        let mut record = entity.to_record();
        let id = self.persist_record(&mut record)?;
        *entity = T::from_record(&record)?;
        Ok(id)
    }

    /// Manages a record for insertion at the next flush.
    ///
    /// If the record has no identity one is generated and set on `record`.
    /// Returns the identity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransactionRequired`] outside a transaction,
    /// [`CoreError::UnknownType`] for unregistered types,
    /// [`CoreError::EntityExists`] if the identity is already managed, and
    /// [`CoreError::SchemaMismatch`] if the identity has the wrong type.
    pub fn persist_record(&mut self, record: &mut Record) -> CoreResult<Value> {
        self.state.ensure_active("persist")?;
        let mapper = self.mapper.clone();
        let entity_type = record.entity_type().to_string();
        let descriptor = mapper.registry().describe_entity(&entity_type)?;
        let identity = descriptor
            .identity()
            .ok_or_else(|| CoreError::invalid_operation(format!("{entity_type} has no identity")))?;
        let id_type = identity.scalar_type().unwrap_or(ScalarType::Text);

        let id = if is_unset_identity(record.get(identity.name())) {
            let id = mapper.id_generator().generate(&entity_type, id_type)?;
            record.set(identity.name(), FieldValue::Scalar(id.clone()));
            id
        } else {
            match record.scalar(identity.name()) {
                Some(id @ Value::Text(_)) if id_type == ScalarType::Text => id.clone(),
                Some(id @ Value::Integer(_)) if id_type == ScalarType::Integer => id.clone(),
                _ => {
                    return Err(CoreError::schema_mismatch(
                        &entity_type,
                        identity.name(),
                        format!("identity must be {id_type}"),
                    ))
                }
            }
        };

        let key = IdentityKey::from_value(&entity_type, &id)?;
        if self.working.contains(&entity_type, &key) {
            return Err(CoreError::EntityExists {
                entity_type,
                id: key.to_string(),
            });
        }
        trace!(entity_type = %entity_type, id = %key, "persist");
        self.working.insert_pending(&entity_type, key, record.clone());
        Ok(id)
    }

    /// Writes every pending entity to the store, in persist order.
    ///
    /// Returns the number written. A failed write does not stop the flush:
    /// every pending entity is attempted, successful writes leave the pending
    /// set, and failures stay pending.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Flush`] listing each failed write, or
    /// [`CoreError::TransactionRequired`] outside a transaction.
    pub fn flush(&mut self) -> CoreResult<usize> {
        self.state.ensure_active("flush")?;
        let mapper = self.mapper.clone();
        let codec = mapper.codec();
        let executor = mapper.executor();

        let mut written = 0;
        let mut failures = Vec::new();
        for entry in self.working.pending() {
            let (entity_type, key) = &entry;
            let Some(entity) = self.working.get(entity_type, key) else {
                continue;
            };
            let result = codec.encode(&entity.record).and_then(|document| {
                executor.insert(entity_type, document.clone())?;
                Ok(document)
            });
            match result {
                Ok(document) => {
                    trace!(entity_type = %entity_type, id = %key, "flushed");
                    self.working.mark_flushed(&entry, document);
                    written += 1;
                }
                Err(error) => {
                    warn!(entity_type = %entity_type, id = %key, %error, "write failed during flush");
                    failures.push(FlushFailure {
                        entity_type: entity_type.clone(),
                        id: key.to_string(),
                        error: Box::new(error),
                    });
                }
            }
        }

        debug!(written, failed = failures.len(), "session flushed");
        if failures.is_empty() {
            Ok(written)
        } else {
            Err(FlushError::new(failures).into())
        }
    }

    /// Flushes, then closes the session.
    ///
    /// If the flush fails the session stays active so the caller can
    /// inspect the failures, retry, or close.
    ///
    /// # Errors
    ///
    /// Returns flush errors, or [`CoreError::TransactionRequired`] outside a transaction.
    pub fn commit(&mut self) -> CoreResult<()> {
        self.state.ensure_active("commit")?;
        self.flush()?;
        self.close()
    }

    /// Closes the session, discarding every managed entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionClosed`] if already closed.
    pub fn close(&mut self) -> CoreResult<()> {
        self.state.ensure_open()?;
        let pending = self.working.pending_count();
        if pending > 0 {
            warn!(pending, "closing session with unflushed writes; they are discarded");
        }
        self.working.clear();
        self.state = SessionState::Closed;
        debug!("session closed");
        Ok(())
    }

    /// Finds a typed entity by identity.
    ///
    /// # Errors
    ///
    /// Same as [`Session::find_record`], plus conversion errors.
    pub fn find<T: Entity>(&mut self, id: impl Into<Value>) -> CoreResult<Option<T>> {
        self.find_record(T::entity_type(), id)?
            .map(|record| T::from_record(&record))
            .transpose()
    }

    /// Finds an entity by identity.
    ///
    /// Returns the managed copy if the session already has one; otherwise
    /// issues one store lookup and manages the result. Absent entities are
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionClosed`], [`CoreError::UnknownType`],
    /// and store or decode errors.
    pub fn find_record(&mut self, entity_type: &str, id: impl Into<Value>) -> CoreResult<Option<Record>> {
        self.state.ensure_open()?;
        let mapper = self.mapper.clone();
        mapper.registry().describe_entity(entity_type)?;
        let id = id.into();
        let key = IdentityKey::from_value(entity_type, &id)?;

        if let Some(entity) = self.working.get(entity_type, &key) {
            trace!(entity_type, id = %key, "found managed entity");
            return Ok(Some(entity.record.clone()));
        }
        let Some(loaded) = mapper.executor().load_by_id(entity_type, &id)? else {
            return Ok(None);
        };
        Ok(Some(self.working.insert_loaded(entity_type, key, loaded.record, loaded.document).clone()))
    }

    /// Creates a typed query from query text.
    ///
    /// # Errors
    ///
    /// Returns translation errors, or [`CoreError::InvalidQuery`] if the
    /// query selects a type other than `T`.
    pub fn create_query<T: Entity>(&mut self, text: &str) -> CoreResult<TypedQuery<'_, T>> {
        self.state.ensure_open()?;
        let compiled = self.mapper.compile(text)?;
        self.typed(QueryKind::Compiled(compiled))
    }

    /// Creates a typed query from criteria.
    ///
    /// # Errors
    ///
    /// Same as [`Session::create_query`].
    pub fn create_criteria_query<T: Entity>(&mut self, criteria: &Criteria) -> CoreResult<TypedQuery<'_, T>> {
        self.state.ensure_open()?;
        let compiled = self.mapper.compile_criteria(criteria)?;
        self.typed(QueryKind::Compiled(compiled))
    }

    /// Creates a typed query from native query text, which is passed to the
    /// store verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionClosed`] or [`CoreError::UnknownType`].
    pub fn create_native_query<T: Entity>(&mut self, text: &str) -> CoreResult<TypedQuery<'_, T>> {
        self.state.ensure_open()?;
        self.mapper.registry().describe_entity(T::entity_type())?;
        Ok(TypedQuery::new(self, QueryKind::Native(text.to_string())))
    }

    fn typed<T: Entity>(&mut self, kind: QueryKind) -> CoreResult<TypedQuery<'_, T>> {
        if let QueryKind::Compiled(query) = &kind {
            if query.entity_type() != T::entity_type() {
                return Err(CoreError::invalid_query(
                    0,
                    format!(
                        "query selects {}, not {}",
                        query.entity_type(),
                        T::entity_type()
                    ),
                ));
            }
        }
        Ok(TypedQuery::new(self, kind))
    }

    /// Drops the collection of `T` and forgets its managed entities.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransactionRequired`] outside a transaction, and store errors.
    pub fn drop_collection<T: Entity>(&mut self) -> CoreResult<()> {
        self.drop_collection_of(T::entity_type())
    }

    /// Drops the collection of `entity_type` and forgets its managed entities.
    ///
    /// # Errors
    ///
    /// Same as [`Session::drop_collection`].
    pub fn drop_collection_of(&mut self, entity_type: &str) -> CoreResult<()> {
        self.state.ensure_active("drop collection")?;
        self.mapper.executor().drop_collection(entity_type)?;
        let evicted = self.working.evict_type(entity_type);
        debug!(entity_type, evicted, "collection dropped");
        Ok(())
    }

    /// Runs a query and manages every result.
    pub(crate) fn run(
        &mut self,
        kind: &QueryKind,
        bindings: &Bindings,
        entity_type: &str,
    ) -> CoreResult<Vec<Record>> {
        self.state.ensure_open()?;
        let mapper = self.mapper.clone();
        let mut results = mapper.executor().execute(kind.source(bindings), entity_type)?;
        let mut records = Vec::new();
        while let Some(loaded) = results.next_loaded() {
            records.push(self.manage(entity_type, loaded?)?);
        }
        Ok(records)
    }

    /// Runs a query that must match exactly one document and manages it.
    pub(crate) fn run_single(
        &mut self,
        kind: &QueryKind,
        bindings: &Bindings,
        entity_type: &str,
    ) -> CoreResult<Record> {
        self.state.ensure_open()?;
        let mapper = self.mapper.clone();
        let loaded = mapper
            .executor()
            .execute(kind.source(bindings), entity_type)?
            .single_loaded()?;
        self.manage(entity_type, loaded)
    }

    fn manage(&mut self, entity_type: &str, loaded: Loaded) -> CoreResult<Record> {
        let mapper = self.mapper.clone();
        let descriptor = mapper.registry().describe_entity(entity_type)?;
        let Some(identity) = descriptor.identity() else {
            return Ok(loaded.record);
        };
        let Some(id) = loaded.record.scalar(identity.name()) else {
            return Ok(loaded.record);
        };
        let key = IdentityKey::from_value(entity_type, id)?;
        Ok(self
            .working
            .insert_loaded(entity_type, key, loaded.record, loaded.document)
            .clone())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let pending = self.working.pending_count();
        if self.state != SessionState::Closed && pending > 0 {
            warn!(pending, "session dropped with unflushed writes");
        }
    }
}

impl QueryKind {
    fn source<'q>(&'q self, bindings: &'q Bindings) -> QuerySource<'q> {
        match self {
            QueryKind::Compiled(query) => QuerySource::Compiled {
                query: query.as_ref(),
                bindings,
            },
            QueryKind::Native(text) => QuerySource::Native(text),
        }
    }
}
