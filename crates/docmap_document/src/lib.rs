//! # docmap document
//!
//! The document value model shared by the docmap crates.
//!
//! A [`Document`] is an ordered mapping from string keys to [`Value`]s,
//! where a value is null, a boolean, a number, a string, a nested document
//! or a sequence. This is the representation the mapper encodes entities
//! into and the representation document stores hand back.
//!
//! ## Usage
//!
//! ```
//! use docmap_document::{Document, Value};
//!
//! let item = Document::new().with("QUANTITY", 2).with("PRICE", 42.0);
//! let order = Document::new()
//!     .with("CUSTOMER", "Tobias Trelle")
//!     .with("ITEMS", vec![Value::from(item)]);
//!
//! assert_eq!(order.get("CUSTOMER").and_then(Value::as_text), Some("Tobias Trelle"));
//! assert_eq!(order.to_string(), r#"{ "CUSTOMER": "Tobias Trelle", "ITEMS": [{ "QUANTITY": 2, "PRICE": 42.0 }] }"#);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod json;
mod value;

pub use document::Document;
pub use error::{DocumentError, DocumentResult};
pub use value::{Value, ValueKind};
