//! # docmap store
//!
//! The document store contract the mapper talks to, plus an in-memory
//! reference implementation.
//!
//! ## Design Principles
//!
//! - The store is an injected collaborator: connection strings, pooling,
//!   retries and timeouts live behind [`DocumentStore`], not in the mapper
//! - Every trait method is exactly one store operation
//! - Native query text is interpreted only by the store
//! - Stores must be `Send + Sync`; sessions on different threads share one
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing, tooling and ephemeral data
//!
//! ## Example
//!
//! ```rust
//! use docmap_document::Document;
//! use docmap_store::{DocumentStore, Filter, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.insert_one("ORDER", Document::new().with("_id", "o-1").with("TOTAL", 89.11)).unwrap();
//!
//! let filter = Filter::Literal(r#"db.ORDER.findOne({_id: "o-1"})"#.to_string());
//! let found: Vec<_> = store.find("ORDER", &filter).unwrap().collect();
//! assert_eq!(found.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filter;
mod memory;
mod shell;
mod store;

pub use error::{StoreError, StoreResult};
pub use filter::matches_filter;
pub use memory::InMemoryStore;
pub use shell::{parse_shell_query, ShellMethod, ShellQuery};
pub use store::{DocumentCursor, DocumentStore, Filter};

/// Document key holding a document's identity.
pub const ID_KEY: &str = "_id";
