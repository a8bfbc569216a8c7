//! Compiled query form.

use crate::error::{CoreError, CoreResult};
use crate::metadata::ScalarType;
use docmap_document::{Document, Value};
use docmap_store::Filter;
use std::collections::HashMap;
use std::fmt;

/// A dotted path of document keys, e.g. `ITEMS.QUANTITY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath(Vec<String>);

impl DocumentPath {
    pub(crate) fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Returns the key segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal from the query text.
    Literal(Value),
    /// A `:name` parameter bound at execution.
    Parameter(String),
}

/// A resolved filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The value at `path` equals `operand`.
    Eq {
        /// Document path being compared.
        path: DocumentPath,
        /// Declared type of the field at `path`.
        field_type: ScalarType,
        /// Value compared against.
        operand: Operand,
    },
    /// Every predicate holds. Repeated paths are kept, not merged.
    And(Vec<Predicate>),
    /// One element of the embedded list at `path` satisfies `predicate`,
    /// whose paths are relative to the element.
    ///
    /// Produced when several conditions name the same join alias over a
    /// list, so they all apply to the same element.
    ElemMatch {
        /// Document path of the embedded list.
        path: DocumentPath,
        /// Condition on a single element.
        predicate: Box<Predicate>,
    },
}

/// Values for `:name` parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    /// Creates an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value, builder style. The name is given without the colon.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// Binds a value, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Returns a bound value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A translated query, ready to run against its collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub(crate) source: String,
    pub(crate) entity_type: String,
    pub(crate) collection: String,
    pub(crate) predicate: Option<Predicate>,
}

impl CompiledQuery {
    /// Returns the query text this was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the selected entity type.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Returns the collection the query runs against.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the filter, or `None` when every document is selected.
    #[must_use]
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Returns the parameter names in order of first use.
    #[must_use]
    pub fn parameters(&self) -> Vec<&str> {
        fn collect<'p>(predicate: &'p Predicate, out: &mut Vec<&'p str>) {
            match predicate {
                Predicate::Eq {
                    operand: Operand::Parameter(name),
                    ..
                } => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                }
                Predicate::Eq { .. } => {}
                Predicate::And(parts) => parts.iter().for_each(|p| collect(p, out)),
                Predicate::ElemMatch { predicate, .. } => collect(predicate, out),
            }
        }
        let mut names = Vec::new();
        if let Some(predicate) = &self.predicate {
            collect(predicate, &mut names);
        }
        names
    }

    /// Lowers the query to the store's native filter form.
    ///
    /// One condition becomes `{"ITEMS.QUANTITY": 2}`; several become
    /// `{"$and": [...]}` so that repeated paths keep every condition.
    /// Conditions sharing a join alias over a list become
    /// `{"ITEMS": {"$elemMatch": {"$and": [{"QUANTITY": 2}, {"PRICE": 47.11}]}}}`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnboundParameter`] if a parameter has no value,
    /// or [`CoreError::InvalidQuery`] if a bound value cannot be compared
    /// with its field.
    pub fn to_filter(&self, bindings: &Bindings) -> CoreResult<Filter> {
        match &self.predicate {
            None => Ok(Filter::All),
            Some(predicate) => Ok(Filter::Native(lower(predicate, bindings)?)),
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn lower(predicate: &Predicate, bindings: &Bindings) -> CoreResult<Document> {
    match predicate {
        Predicate::Eq {
            path,
            field_type,
            operand,
        } => {
            let value = match operand {
                Operand::Literal(v) => v.clone(),
                Operand::Parameter(name) => {
                    let bound = bindings
                        .get(name)
                        .ok_or_else(|| CoreError::UnboundParameter { name: name.clone() })?;
                    if !comparable(bound, *field_type) {
                        return Err(CoreError::invalid_query(
                            0,
                            format!(
                                "parameter :{name} is {}, but {path} holds {field_type}",
                                bound.kind()
                            ),
                        ));
                    }
                    bound.clone()
                }
            };
            Ok(Document::new().with(path.to_string(), normalize(value, *field_type)))
        }
        Predicate::And(parts) => {
            let mut clauses = Vec::with_capacity(parts.len());
            for part in parts {
                clauses.push(Value::Document(lower(part, bindings)?));
            }
            Ok(Document::new().with("$and", Value::Array(clauses)))
        }
        Predicate::ElemMatch { path, predicate } => {
            let element = lower(predicate, bindings)?;
            Ok(Document::new().with(
                path.to_string(),
                Document::new().with("$elemMatch", element),
            ))
        }
    }
}

/// Returns true if `value` can be compared with a field of type `ty`.
pub(crate) fn comparable(value: &Value, ty: ScalarType) -> bool {
    match (ty, value) {
        (_, Value::Null) => true,
        (ScalarType::Text, Value::Text(_)) | (ScalarType::Boolean, Value::Bool(_)) => true,
        (ScalarType::Integer | ScalarType::Float, v) => v.is_number(),
        _ => false,
    }
}

/// Stores the value the way the codec would, when that is lossless.
fn normalize(value: Value, ty: ScalarType) -> Value {
    let widened = match (ty, &value) {
        (ScalarType::Float, Value::Integer(_)) => value.to_f64_lossless().map(Value::Float),
        (ScalarType::Integer, Value::Float(_)) => value.to_i64_lossless().map(Value::Integer),
        _ => None,
    };
    widened.unwrap_or(value)
}
