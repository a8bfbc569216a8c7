//! Resolved entity descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean.
    Boolean,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarType::Text => "text",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
        })
    }
}

/// What a field holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A single scalar value.
    Scalar(ScalarType),
    /// An ordered sequence of embedded values of the named type.
    EmbeddedList(String),
    /// One embedded value of the named type.
    EmbeddedEntity(String),
}

impl FieldKind {
    /// Returns the embedded type name, if this field embeds one.
    #[must_use]
    pub fn embedded_type(&self) -> Option<&str> {
        match self {
            FieldKind::Scalar(_) => None,
            FieldKind::EmbeddedList(ty) | FieldKind::EmbeddedEntity(ty) => Some(ty),
        }
    }
}

/// A persistent field and the document key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub(crate) name: String,
    pub(crate) key: String,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
}

impl FieldMapping {
    /// Returns the field name as written in entity code and queries.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the document key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns what the field holds.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Returns true if the field must be present and non-null.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the scalar type, if this is a scalar field.
    #[must_use]
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            FieldKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }
}

/// Persistence metadata for one registered type.
///
/// Entity descriptors name a collection and an identity field. Embeddable
/// descriptors have no identity and are only stored inside their owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub(crate) type_name: String,
    pub(crate) collection: String,
    pub(crate) identity: Option<usize>,
    pub(crate) fields: Vec<FieldMapping>,
}

impl EntityDescriptor {
    /// Returns the type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the collection the type's documents live in.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the identity field, or `None` for embeddables.
    #[must_use]
    pub fn identity(&self) -> Option<&FieldMapping> {
        self.identity.map(|i| &self.fields[i])
    }

    /// Returns true if the type has no identity and cannot be persisted on its own.
    #[must_use]
    pub fn is_embeddable(&self) -> bool {
        self.identity.is_none()
    }

    /// Returns the persistent fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field by document key.
    #[must_use]
    pub fn field_by_key(&self, key: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.key == key)
    }
}
