//! Declarative type definitions.
//!
//! Definitions are what users write (in code or as JSON); the
//! [`Registry`](super::Registry) resolves them into descriptors.

use super::descriptor::{FieldKind, ScalarType};
use super::keys::KeyCase;
use serde::{Deserialize, Serialize};

/// Declaration of an entity or embeddable type.
///
/// # Example
///
/// ```rust
/// use docmap_core::{EntityDefinition, FieldDefinition, ScalarType};
///
/// let order = EntityDefinition::entity("Order", "id")
///     .field(FieldDefinition::scalar("id", ScalarType::Text))
///     .field(FieldDefinition::scalar("customer", ScalarType::Text))
///     .field(FieldDefinition::list("items", "Item"));
/// assert_eq!(order.fields.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Type name used in queries and records.
    pub name: String,
    /// Identity field name; `None` declares an embeddable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Collection name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Key case override for this type's collection and field keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_case: Option<KeyCase>,
    /// Persistent fields in document order.
    pub fields: Vec<FieldDefinition>,
}

impl EntityDefinition {
    /// Declares an entity with the given identity field.
    pub fn entity(name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: Some(identity.into()),
            collection: None,
            key_case: None,
            fields: Vec::new(),
        }
    }

    /// Declares an embeddable type.
    pub fn embeddable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: None,
            collection: None,
            key_case: None,
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Overrides the collection name.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Overrides the key case.
    #[must_use]
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.key_case = Some(case);
        self
    }
}

/// Declaration of one persistent field.
///
/// In JSON the kind is flattened into the field object:
/// `{"name": "quantity", "scalar": "integer"}` or
/// `{"name": "items", "embedded_list": "Item"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name.
    pub name: String,
    /// What the field holds.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Document key override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Whether the field must be present and non-null.
    #[serde(default = "required_by_default")]
    pub required: bool,
}

fn required_by_default() -> bool {
    true
}

impl FieldDefinition {
    /// Declares a required scalar field.
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::new(name, FieldKind::Scalar(ty))
    }

    /// Declares a required sequence of embedded values.
    pub fn list(name: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self::new(name, FieldKind::EmbeddedList(element_type.into()))
    }

    /// Declares a required single embedded value.
    pub fn embedded(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::new(name, FieldKind::EmbeddedEntity(ty.into()))
    }

    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            key: None,
            required: true,
        }
    }

    /// Overrides the document key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}
