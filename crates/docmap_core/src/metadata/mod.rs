//! Entity metadata: definitions, descriptors and the registry.

mod definition;
mod descriptor;
mod keys;
mod registry;

pub use definition::{EntityDefinition, FieldDefinition};
pub use descriptor::{EntityDescriptor, FieldKind, FieldMapping, ScalarType};
pub use keys::{KeyCase, KeyMapper};
pub use registry::Registry;
