//! Query translation.
//!
//! Text queries are tokenized, parsed into a statement, and resolved against
//! the [`Registry`] into a [`CompiledQuery`] whose predicate uses document
//! keys. [`Criteria`] builds the same statement in code.

mod ast;
mod cache;
mod compiler;
mod criteria;
mod lexer;
mod syntax;

pub use ast::{Bindings, CompiledQuery, DocumentPath, Operand, Predicate};
pub use cache::{CacheStats, QueryCache};
pub use criteria::Criteria;

use crate::error::CoreResult;
use crate::metadata::Registry;
use tracing::debug;

/// Translates query text into a compiled query.
///
/// # Errors
///
/// Returns [`crate::CoreError::InvalidQuery`] for syntax or structural
/// errors, [`crate::CoreError::UnknownType`] and
/// [`crate::CoreError::UnknownField`] for names the registry does not know,
/// and [`crate::CoreError::UnsupportedPath`] for paths reaching more than
/// one field into an embedded list.
///
/// # Example
///
/// ```rust
/// use docmap_core::{translate, EntityDefinition, FieldDefinition, Registry, ScalarType};
///
/// let mut registry = Registry::new();
/// registry.register(
///     EntityDefinition::entity("Order", "id")
///         .field(FieldDefinition::scalar("id", ScalarType::Text))
///         .field(FieldDefinition::list("items", "Item")),
/// ).unwrap();
/// registry.register(
///     EntityDefinition::embeddable("Item")
///         .field(FieldDefinition::scalar("quantity", ScalarType::Integer)),
/// ).unwrap();
///
/// let query = translate("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2", &registry).unwrap();
/// assert_eq!(query.collection(), "ORDER");
/// ```
pub fn translate(text: &str, registry: &Registry) -> CoreResult<CompiledQuery> {
    let statement = syntax::parse(text)?;
    let compiled = compiler::compile(&statement, text.to_string(), registry)?;
    debug!(query = text, entity = compiled.entity_type(), "translated query");
    Ok(compiled)
}
