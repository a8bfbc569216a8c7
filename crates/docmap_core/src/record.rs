//! In-memory entity representation.

use crate::error::{CoreError, CoreResult};
use docmap_document::Value;

/// Value of one field in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A scalar, or `Null` for an unset field of any kind.
    Scalar(Value),
    /// One embedded value.
    Entity(Record),
    /// A sequence of embedded values.
    List(Vec<Record>),
}

impl FieldValue {
    /// Returns true for `Scalar(Null)`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Scalar(Value::Null))
    }
}

/// An entity or embeddable instance as named fields.
///
/// Records are what the codec encodes and decodes; typed structs convert
/// to and from them through [`Entity`].
///
/// # Example
///
/// ```rust
/// use docmap_core::Record;
///
/// let item = Record::new("Item").with("quantity", 2).with("price", 42.0);
/// let order = Record::new("Order")
///     .with("customer", "Tobias Trelle")
///     .with_list("items", vec![item]);
/// assert_eq!(order.list("items").unwrap().len(), 1);
/// ```
///
/// Two records are equal when they have the same type and the same value
/// for every field, whatever order the fields were set in. A field that is
/// not set equals one set to `Null`.
#[derive(Debug, Clone)]
pub struct Record {
    entity_type: String,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Creates an empty record of the given type.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the type name.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Sets a scalar field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, FieldValue::Scalar(value.into()));
        self
    }

    /// Sets an embedded field, builder style.
    #[must_use]
    pub fn with_entity(mut self, name: impl Into<String>, value: Record) -> Self {
        self.set(name, FieldValue::Entity(value));
        self
    }

    /// Sets an embedded sequence field, builder style.
    #[must_use]
    pub fn with_list(mut self, name: impl Into<String>, values: Vec<Record>) -> Self {
        self.set(name, FieldValue::List(values));
        self
    }

    /// Sets a field, replacing any existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Returns a field's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns a scalar field's value.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(FieldValue::Scalar(v)) => Some(v),
            _ => None,
        }
    }

    /// Iterates over fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the number of fields set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn mismatch(&self, name: &str, expected: &str) -> CoreError {
        let found = match self.get(name) {
            None => "nothing".to_string(),
            Some(FieldValue::Scalar(v)) => v.kind().to_string(),
            Some(FieldValue::Entity(_)) => "an embedded value".to_string(),
            Some(FieldValue::List(_)) => "an embedded list".to_string(),
        };
        CoreError::schema_mismatch(
            &self.entity_type,
            name,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Reads a required text field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field is absent or not text.
    pub fn text(&self, name: &str) -> CoreResult<String> {
        self.scalar(name)
            .and_then(Value::as_text)
            .map(str::to_string)
            .ok_or_else(|| self.mismatch(name, "text"))
    }

    /// Reads an optional text field; absent and null read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field holds something else.
    pub fn optional_text(&self, name: &str) -> CoreResult<Option<String>> {
        match self.get(name) {
            None | Some(FieldValue::Scalar(Value::Null)) => Ok(None),
            Some(_) => self.text(name).map(Some),
        }
    }

    /// Reads a required integer field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field is absent or not an integer.
    pub fn integer(&self, name: &str) -> CoreResult<i64> {
        self.scalar(name)
            .and_then(Value::as_integer)
            .ok_or_else(|| self.mismatch(name, "an integer"))
    }

    /// Reads a required float field; integers widen.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field is absent or not numeric.
    pub fn float(&self, name: &str) -> CoreResult<f64> {
        self.scalar(name)
            .and_then(Value::to_f64_lossless)
            .ok_or_else(|| self.mismatch(name, "a float"))
    }

    /// Reads a required boolean field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field is absent or not a boolean.
    pub fn boolean(&self, name: &str) -> CoreResult<bool> {
        self.scalar(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.mismatch(name, "a boolean"))
    }

    /// Reads an embedded sequence; null and absent read as empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field holds something else.
    pub fn list(&self, name: &str) -> CoreResult<&[Record]> {
        match self.get(name) {
            Some(FieldValue::List(items)) => Ok(items),
            None | Some(FieldValue::Scalar(Value::Null)) => Ok(&[]),
            Some(_) => Err(self.mismatch(name, "an embedded list")),
        }
    }

    /// Reads an embedded value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMismatch`] if the field is absent or not embedded.
    pub fn entity(&self, name: &str) -> CoreResult<&Record> {
        match self.get(name) {
            Some(FieldValue::Entity(record)) => Ok(record),
            _ => Err(self.mismatch(name, "an embedded value")),
        }
    }
}

/// A typed entity or embeddable that converts to and from a [`Record`].
///
/// The conversion is explicit; nothing is discovered by reflection.
///
/// # Example
///
/// ```rust
/// use docmap_core::{CoreResult, Entity, Record};
///
/// struct Item {
///     quantity: i64,
/// }
///
/// impl Entity for Item {
///     fn entity_type() -> &'static str {
///         "Item"
///     }
///
///     fn to_record(&self) -> Record {
///         Record::new("Item").with("quantity", self.quantity)
///     }
///
///     fn from_record(record: &Record) -> CoreResult<Self> {
///         Ok(Item { quantity: record.integer("quantity")? })
///     }
/// }
/// ```
pub trait Entity: Sized {
    /// Returns the registered type name.
    fn entity_type() -> &'static str;

    /// Converts the instance to a record.
    fn to_record(&self) -> Record;

    /// Builds an instance from a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not have the expected fields.
    fn from_record(record: &Record) -> CoreResult<Self>;
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        fn same(value: &FieldValue, other: Option<&FieldValue>) -> bool {
            match other {
                Some(other) => value == other,
                None => value.is_null(),
            }
        }

        self.entity_type == other.entity_type
            && self
                .fields
                .iter()
                .all(|(name, value)| same(value, other.get(name)))
            && other
                .fields
                .iter()
                .all(|(name, value)| self.get(name).is_some() || value.is_null())
    }
}
