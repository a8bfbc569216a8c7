//! JSON interop through serde.
//!
//! Documents serialize as JSON objects in key order. Deserialization goes
//! through `serde_json::Value`, so integers that fit `i64` stay integers and
//! every other number becomes a float.

use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};
use crate::value::Value;
use serde::de::Error as _;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Document(d) => d.serialize(serializer),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::try_from(json).map_err(D::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Document::try_from(json).map_err(D::Error::custom)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = DocumentError;

    fn try_from(json: serde_json::Value) -> DocumentResult<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    return Err(DocumentError::UnrepresentableNumber {
                        number: n.to_string(),
                    });
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<DocumentResult<_>>()?,
            ),
            serde_json::Value::Object(map) => {
                let mut doc = Document::with_capacity(map.len());
                for (key, value) in map {
                    doc.insert(key, Value::try_from(value)?);
                }
                Value::Document(doc)
            }
        })
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = DocumentError;

    fn try_from(json: serde_json::Value) -> DocumentResult<Self> {
        match Value::try_from(json)? {
            Value::Document(doc) => Ok(doc),
            other => Err(DocumentError::not_a_document(other.kind().to_string())),
        }
    }
}

impl Document {
    /// Parses a JSON object into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or not an object.
    pub fn from_json_str(text: &str) -> DocumentResult<Self> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DocumentError::invalid_json(e.to_string()))?;
        Document::try_from(json)
    }

    /// Renders the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> String {
        // Serializing into a String cannot fail for this type.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
