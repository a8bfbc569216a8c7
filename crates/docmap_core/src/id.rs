//! Identity generation and identity keys.

use crate::error::{CoreError, CoreResult};
use crate::metadata::ScalarType;
use docmap_document::Value;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Which built-in generator a mapper uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdStrategy {
    /// Random UUID v4 text; text identities only.
    #[default]
    Uuid,
    /// Process-local counter starting at 1.
    Sequence,
}

impl IdStrategy {
    /// Creates the generator for this strategy.
    #[must_use]
    pub fn generator(self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Uuid => Box::new(UuidGenerator),
            IdStrategy::Sequence => Box::new(SequenceGenerator::new()),
        }
    }
}

/// Produces identities for entities persisted without one.
pub trait IdGenerator: Send + Sync {
    /// Generates an identity for `entity_type` whose identity field has type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if the generator cannot
    /// produce values of `ty`.
    fn generate(&self, entity_type: &str, ty: ScalarType) -> CoreResult<Value>;
}

/// Generates random UUID v4 identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self, entity_type: &str, ty: ScalarType) -> CoreResult<Value> {
        match ty {
            ScalarType::Text => Ok(Value::Text(Uuid::new_v4().to_string())),
            other => Err(CoreError::invalid_operation(format!(
                "cannot generate a uuid for {entity_type}: identity is {other}"
            ))),
        }
    }
}

/// Generates increasing identities: integers, or their decimal text.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicI64,
}

impl SequenceGenerator {
    /// Creates a sequence starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a sequence starting at `first`.
    #[must_use]
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequenceGenerator {
    fn generate(&self, entity_type: &str, ty: ScalarType) -> CoreResult<Value> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        match ty {
            ScalarType::Integer => Ok(Value::Integer(n)),
            ScalarType::Text => Ok(Value::Text(n.to_string())),
            other => Err(CoreError::invalid_operation(format!(
                "cannot generate a sequence id for {entity_type}: identity is {other}"
            ))),
        }
    }
}

/// A hashable identity, used to key the session's working set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Text identity.
    Text(String),
    /// Integer identity.
    Integer(i64),
}

impl IdentityKey {
    /// Reads an identity value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] for values that cannot be identities.
    pub fn from_value(entity_type: &str, value: &Value) -> CoreResult<Self> {
        match value {
            Value::Text(s) if !s.is_empty() => Ok(IdentityKey::Text(s.clone())),
            Value::Integer(n) => Ok(IdentityKey::Integer(*n)),
            other => Err(CoreError::schema_mismatch(
                entity_type,
                "<identity>",
                format!("{} cannot be an identity", other.kind()),
            )),
        }
    }

    /// Converts back to a document value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            IdentityKey::Text(s) => Value::Text(s.clone()),
            IdentityKey::Integer(n) => Value::Integer(*n),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Text(s) => f.write_str(s),
            IdentityKey::Integer(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_unique_text() {
        let generator = UuidGenerator;
        let ids: HashSet<String> = (0..100)
            .map(|_| {
                generator
                    .generate("Order", ScalarType::Text)
                    .unwrap()
                    .as_text()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn uuid_rejects_integer_identity() {
        assert!(UuidGenerator.generate("Order", ScalarType::Integer).is_err());
    }

    #[test]
    fn sequence_counts_up() {
        let generator = SequenceGenerator::new();
        assert_eq!(generator.generate("Order", ScalarType::Integer).unwrap(), Value::Integer(1));
        assert_eq!(generator.generate("Order", ScalarType::Text).unwrap(), Value::Text("2".into()));
        assert!(generator.generate("Order", ScalarType::Float).is_err());
    }

    #[test]
    fn strategy_builds_generator() {
        let generator = IdStrategy::Sequence.generator();
        assert_eq!(generator.generate("Order", ScalarType::Integer).unwrap(), Value::Integer(1));
    }

    #[test]
    fn identity_keys() {
        let key = IdentityKey::from_value("Order", &Value::from("o-1")).unwrap();
        assert_eq!(key.to_string(), "o-1");
        assert_eq!(key.to_value(), Value::from("o-1"));
        assert!(IdentityKey::from_value("Order", &Value::Float(1.5)).is_err());
        assert!(IdentityKey::from_value("Order", &Value::from("")).is_err());
    }
}
