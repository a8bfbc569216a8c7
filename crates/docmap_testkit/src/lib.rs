//! # docmap testkit
//!
//! Test utilities for docmap.
//!
//! This crate provides:
//! - The `Order`/`Item` model with typed [`Entity`](docmap_core::Entity) implementations
//! - A nested `Shipment` model for paths the translator rejects
//! - Mapper fixtures backed by an inspectable in-memory store
//! - A store wrapper that fails selected operations
//! - Property-based test generators using proptest
//! - Schema and data files on disk for command-line tests
//!
//! ## Usage
//!
//! ```rust
//! use docmap_testkit::prelude::*;
//!
//! let fixture = TestMapper::new();
//! let id = fixture.seed_sample_order();
//!
//! let mut session = fixture.mapper.session();
//! let order: Order = session.find(id.as_str()).unwrap().unwrap();
//! assert_eq!(order.items.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stores;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stores::*;
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stores::*;
