//! Typed queries bound to a session.

use super::unit::Session;
use crate::error::CoreResult;
use crate::query::{Bindings, CompiledQuery};
use crate::record::{Entity, Record};
use docmap_document::Value;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) enum QueryKind {
    Compiled(Arc<CompiledQuery>),
    Native(String),
}

/// A query whose results are read as `T`.
///
/// Results become managed by the session: an entity the session already
/// manages is returned as the managed copy.
#[derive(Debug)]
pub struct TypedQuery<'s, T> {
    session: &'s mut Session,
    kind: QueryKind,
    bindings: Bindings,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> TypedQuery<'s, T> {
    pub(crate) fn new(session: &'s mut Session, kind: QueryKind) -> Self {
        Self {
            session,
            kind,
            bindings: Bindings::new(),
            _entity: PhantomData,
        }
    }

    /// Binds a `:name` parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.bind(name, value);
        self
    }

    /// Returns the compiled form, or `None` for native queries.
    #[must_use]
    pub fn compiled(&self) -> Option<&CompiledQuery> {
        match &self.kind {
            QueryKind::Compiled(query) => Some(query.as_ref()),
            QueryKind::Native(_) => None,
        }
    }

    /// Runs the query and returns every result.
    ///
    /// # Errors
    ///
    /// Returns parameter, store, decode and conversion errors.
    pub fn result_list(self) -> CoreResult<Vec<T>> {
        self.records()?.iter().map(T::from_record).collect()
    }

    /// Runs the query and returns its only result.
    ///
    /// A native `db.COLL.findOne(..)` query yields at most one document, so it
    /// never fails with [`crate::CoreError::NonUniqueResult`]; use
    /// `db.COLL.find(..)` to have several matches reported.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NoResult`] if nothing matched and
    /// [`crate::CoreError::NonUniqueResult`] if more than one document did.
    pub fn single_result(self) -> CoreResult<T> {
        let record = self
            .session
            .run_single(&self.kind, &self.bindings, T::entity_type())?;
        T::from_record(&record)
    }

    /// Runs the query and returns the records without converting them.
    ///
    /// # Errors
    ///
    /// Returns parameter, store and decode errors.
    pub fn records(self) -> CoreResult<Vec<Record>> {
        self.session
            .run(&self.kind, &self.bindings, T::entity_type())
    }
}
