//! # docmap core
//!
//! Maps typed entities to documents and translates a small JPQL-like query
//! language into native document-store filters.
//!
//! This crate provides:
//! - An entity metadata registry: identity, collection, and the document key of every field
//! - A codec between entity records and ordered documents, with embedded values and lists
//! - A query translator that flattens joins over embedded lists into dotted
//!   document paths (`i.quantity` over `o.items` becomes `ITEMS.QUANTITY`)
//! - A query executor with list and single-result modes, plus native query pass-through
//! - Sessions: a unit of work with persist, flush, find and typed queries
//!
//! ## Example
//!
//! ```rust
//! use docmap_core::{EntityDefinition, FieldDefinition, Mapper, Record, ScalarType};
//!
//! let mapper = Mapper::builder()
//!     .entity(
//!         EntityDefinition::entity("Order", "id")
//!             .field(FieldDefinition::scalar("id", ScalarType::Text))
//!             .field(FieldDefinition::scalar("customer", ScalarType::Text))
//!             .field(FieldDefinition::list("items", "Item")),
//!     )
//!     .entity(
//!         EntityDefinition::embeddable("Item")
//!             .field(FieldDefinition::scalar("quantity", ScalarType::Integer)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut session = mapper.session();
//! session.begin().unwrap();
//! let mut order = Record::new("Order")
//!     .with("customer", "Tobias Trelle")
//!     .with_list("items", vec![Record::new("Item").with("quantity", 2)]);
//! session.persist_record(&mut order).unwrap();
//! session.flush().unwrap();
//!
//! let query = mapper
//!     .compile("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2")
//!     .unwrap();
//! assert_eq!(
//!     query.to_filter(&Default::default()).unwrap().to_string(),
//!     r#"{ "ITEMS.QUANTITY": 2 }"#
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod error;
mod executor;
mod id;
mod mapper;
mod metadata;
mod query;
mod record;
mod session;

pub use codec::DocumentCodec;
pub use config::MapperConfig;
pub use error::{CoreError, CoreResult, FlushError, FlushFailure};
pub use executor::{QueryExecutor, QuerySource, Results};
pub use id::{IdGenerator, IdStrategy, IdentityKey, SequenceGenerator, UuidGenerator};
pub use mapper::{Mapper, MapperBuilder};
pub use metadata::{
    EntityDefinition, EntityDescriptor, FieldDefinition, FieldKind, FieldMapping, KeyCase,
    KeyMapper, Registry, ScalarType,
};
pub use query::{
    translate, Bindings, CacheStats, CompiledQuery, Criteria, DocumentPath, Operand, Predicate,
    QueryCache,
};
pub use record::{Entity, FieldValue, Record};
pub use session::{Session, SessionState, TypedQuery};
