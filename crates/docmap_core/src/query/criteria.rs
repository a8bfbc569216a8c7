//! Programmatic query construction.

use super::ast::CompiledQuery;
use super::compiler::compile;
use super::syntax::{Comparison, JoinClause, OperandExpr, PathExpr, SelectStatement};
use crate::error::CoreResult;
use crate::metadata::Registry;
use docmap_document::Value;
use std::fmt;

/// Builds a query without writing query text.
///
/// A criteria query compiles through the same resolver as text queries and
/// obeys the same path rules.
///
/// # Example
///
/// ```rust
/// use docmap_core::Criteria;
///
/// let criteria = Criteria::of("Order", "o")
///     .join("o.items", "i")
///     .where_eq("i.quantity", 2);
/// assert_eq!(
///     criteria.to_string(),
///     "SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    statement: SelectStatement,
}

impl Criteria {
    /// Selects every `entity`, bound to `alias`.
    pub fn of(entity: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            statement: SelectStatement {
                selected: alias.clone(),
                selected_offset: 0,
                entity: entity.into(),
                entity_offset: 0,
                root_alias: alias,
                joins: Vec::new(),
                conditions: Vec::new(),
            },
        }
    }

    /// Joins the embedded field at `path` (e.g. `o.items`) as `alias`.
    #[must_use]
    pub fn join(mut self, path: &str, alias: impl Into<String>) -> Self {
        self.statement.joins.push(JoinClause {
            source: PathExpr::from_dotted(path),
            alias: alias.into(),
            offset: 0,
        });
        self
    }

    /// Requires the field at `path` to equal `value`.
    #[must_use]
    pub fn where_eq(self, path: &str, value: impl Into<Value>) -> Self {
        self.condition(path, OperandExpr::Literal(value.into()))
    }

    /// Requires the field at `path` to equal the parameter `name`, bound at execution.
    #[must_use]
    pub fn where_param(self, path: &str, name: impl Into<String>) -> Self {
        self.condition(path, OperandExpr::Parameter(name.into()))
    }

    fn condition(mut self, path: &str, operand: OperandExpr) -> Self {
        self.statement.conditions.push(Comparison {
            path: PathExpr::from_dotted(path),
            operand,
            offset: 0,
        });
        self
    }

    /// Returns the selected entity type.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.statement.entity
    }

    /// Resolves the criteria against the registry.
    ///
    /// # Errors
    ///
    /// Same as text queries: unknown types or fields, unsupported paths and
    /// invalid structure.
    pub fn compile(&self, registry: &Registry) -> CoreResult<CompiledQuery> {
        compile(&self.statement, self.statement.to_string(), registry)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statement)
    }
}
