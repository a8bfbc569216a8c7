//! Record to document conversion.
//!
//! Encoding walks the descriptor, not the record, so the document's key
//! order always follows declaration order. Embedded values are encoded
//! recursively with their own descriptors.

use crate::error::{CoreError, CoreResult};
use crate::metadata::{EntityDescriptor, FieldKind, FieldMapping, Registry, ScalarType};
use crate::record::{FieldValue, Record};
use docmap_document::{Document, Value};

/// Converts records to documents and back using registered descriptors.
#[derive(Debug, Clone, Copy)]
pub struct DocumentCodec<'r> {
    registry: &'r Registry,
}

/// Returns true if an identity value means "not assigned yet".
pub(crate) fn is_unset_identity(value: Option<&FieldValue>) -> bool {
    match value {
        None => true,
        Some(FieldValue::Scalar(Value::Null)) => true,
        Some(FieldValue::Scalar(Value::Text(s))) => s.is_empty(),
        Some(_) => false,
    }
}

enum Coercion {
    WrongKind,
    Lossy,
}

/// Converts a non-null scalar to the declared type, widening numbers only when lossless.
fn coerce(value: &Value, target: ScalarType) -> Result<Value, Coercion> {
    match (target, value) {
        (ScalarType::Text, Value::Text(_))
        | (ScalarType::Boolean, Value::Bool(_))
        | (ScalarType::Integer, Value::Integer(_))
        | (ScalarType::Float, Value::Float(_)) => Ok(value.clone()),
        (ScalarType::Float, Value::Integer(_)) => value
            .to_f64_lossless()
            .map(Value::Float)
            .ok_or(Coercion::Lossy),
        (ScalarType::Integer, Value::Float(_)) => value
            .to_i64_lossless()
            .map(Value::Integer)
            .ok_or(Coercion::Lossy),
        _ => Err(Coercion::WrongKind),
    }
}

impl<'r> DocumentCodec<'r> {
    /// Creates a codec over a registry.
    #[must_use]
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Encodes a record to a document.
    ///
    /// An unset identity (absent, null or empty text) is left out of the
    /// document so the store can assign one. Optional fields that are
    /// absent are written as null.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if the record's type is not
    /// registered, and [`CoreError::SchemaMismatch`] if a required field is
    /// missing, a value has the wrong kind, or the record sets a field the
    /// descriptor does not declare.
    pub fn encode(&self, record: &Record) -> CoreResult<Document> {
        let descriptor = self.registry.describe(record.entity_type())?;
        self.encode_with(descriptor, record)
    }

    fn encode_with(&self, descriptor: &EntityDescriptor, record: &Record) -> CoreResult<Document> {
        let type_name = descriptor.type_name();
        if record.entity_type() != type_name {
            return Err(CoreError::schema_mismatch(
                type_name,
                "",
                format!("expected a {type_name} record, found {}", record.entity_type()),
            ));
        }
        if let Some((name, _)) = record.fields().find(|(name, _)| descriptor.field(name).is_none()) {
            return Err(CoreError::schema_mismatch(type_name, name, "field is not mapped"));
        }

        let identity = descriptor.identity().map(FieldMapping::name);
        let mut doc = Document::with_capacity(descriptor.fields().len());
        for field in descriptor.fields() {
            let value = record.get(field.name());
            if identity == Some(field.name()) && is_unset_identity(value) {
                continue;
            }
            let encoded = match value {
                None | Some(FieldValue::Scalar(Value::Null)) => {
                    if field.is_required() {
                        return Err(CoreError::schema_mismatch(
                            type_name,
                            field.name(),
                            "required field is missing",
                        ));
                    }
                    Value::Null
                }
                Some(value) => self.encode_field(type_name, field, value)?,
            };
            doc.insert(field.key(), encoded);
        }
        Ok(doc)
    }

    fn encode_field(
        &self,
        type_name: &str,
        field: &FieldMapping,
        value: &FieldValue,
    ) -> CoreResult<Value> {
        match (field.kind(), value) {
            (FieldKind::Scalar(ty), FieldValue::Scalar(v)) => {
                coerce(v, *ty).map_err(|_| {
                    CoreError::schema_mismatch(
                        type_name,
                        field.name(),
                        format!("expected {ty}, found {}", v.kind()),
                    )
                })
            }
            (FieldKind::EmbeddedList(ty), FieldValue::List(items)) => {
                let descriptor = self.registry.describe(ty)?;
                let mut encoded = Vec::with_capacity(items.len());
                for item in items {
                    encoded.push(Value::Document(self.encode_with(descriptor, item)?));
                }
                Ok(Value::Array(encoded))
            }
            (FieldKind::EmbeddedEntity(ty), FieldValue::Entity(inner)) => {
                let descriptor = self.registry.describe(ty)?;
                Ok(Value::Document(self.encode_with(descriptor, inner)?))
            }
            (kind, _) => Err(CoreError::schema_mismatch(
                type_name,
                field.name(),
                format!("value does not fit {}", describe_kind(kind)),
            )),
        }
    }

    /// Decodes a document into a record of `entity_type`.
    ///
    /// Document keys that no field maps to are ignored. Optional fields that
    /// are absent or null decode as null.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if a required field is missing
    /// or a value has the wrong shape, and [`CoreError::TypeCoercion`] if a
    /// number cannot be converted to the declared type without loss.
    pub fn decode(&self, document: &Document, entity_type: &str) -> CoreResult<Record> {
        let descriptor = self.registry.describe(entity_type)?;
        self.decode_with(descriptor, document)
    }

    fn decode_with(&self, descriptor: &EntityDescriptor, document: &Document) -> CoreResult<Record> {
        let type_name = descriptor.type_name();
        let mut record = Record::new(type_name);
        for field in descriptor.fields() {
            let value = match document.get(field.key()) {
                None | Some(Value::Null) => {
                    if field.is_required() {
                        return Err(CoreError::schema_mismatch(
                            type_name,
                            field.name(),
                            format!("document has no {}", field.key()),
                        ));
                    }
                    FieldValue::Scalar(Value::Null)
                }
                Some(value) => self.decode_field(type_name, field, value)?,
            };
            record.set(field.name(), value);
        }
        Ok(record)
    }

    fn decode_field(&self, type_name: &str, field: &FieldMapping, value: &Value) -> CoreResult<FieldValue> {
        match (field.kind(), value) {
            (FieldKind::Scalar(ty), v) => match coerce(v, *ty) {
                Ok(v) => Ok(FieldValue::Scalar(v)),
                Err(Coercion::Lossy) => Err(CoreError::TypeCoercion {
                    entity_type: type_name.to_string(),
                    field: field.name().to_string(),
                    value: v.to_string(),
                    target: ty.to_string(),
                }),
                Err(Coercion::WrongKind) => Err(CoreError::schema_mismatch(
                    type_name,
                    field.name(),
                    format!("expected {ty}, found {}", v.kind()),
                )),
            },
            (FieldKind::EmbeddedList(ty), Value::Array(items)) => {
                let descriptor = self.registry.describe(ty)?;
                let mut decoded = Vec::with_capacity(items.len());
                for item in items {
                    let Some(doc) = item.as_document() else {
                        return Err(CoreError::schema_mismatch(
                            type_name,
                            field.name(),
                            format!("expected embedded documents, found {}", item.kind()),
                        ));
                    };
                    decoded.push(self.decode_with(descriptor, doc)?);
                }
                Ok(FieldValue::List(decoded))
            }
            (FieldKind::EmbeddedEntity(ty), Value::Document(doc)) => {
                let descriptor = self.registry.describe(ty)?;
                Ok(FieldValue::Entity(self.decode_with(descriptor, doc)?))
            }
            (kind, v) => Err(CoreError::schema_mismatch(
                type_name,
                field.name(),
                format!("expected {}, found {}", describe_kind(kind), v.kind()),
            )),
        }
    }
}

fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Scalar(ty) => ty.to_string(),
        FieldKind::EmbeddedList(ty) => format!("a list of {ty}"),
        FieldKind::EmbeddedEntity(ty) => format!("an embedded {ty}"),
    }
}
