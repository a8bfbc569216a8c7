//! CLI command implementations.
//!
//! Every command reads a schema file: a JSON array of entity definitions.
//! `query` also reads a data file: a JSON object mapping collection names to
//! arrays of stored documents, e.g. `{"ORDER": [{"_id": "o-1", ...}]}`.

pub mod query;
pub mod schema;
pub mod translate;

use crate::error::{CliError, CliResult};
use docmap_core::{Bindings, EntityDefinition, Mapper, MapperBuilder};
use docmap_document::{Document, Value};
use docmap_store::{DocumentStore, InMemoryStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Output format of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses `text` or `json`.
    pub fn parse(name: &str) -> CliResult<Self> {
        match name {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::Format(other.to_string())),
        }
    }
}

fn read_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads entity definitions from a schema file.
pub fn read_definitions(path: &Path) -> CliResult<Vec<EntityDefinition>> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

/// Builds a mapper over `store` with every definition in the schema file.
pub fn build_mapper(schema: &Path, store: Arc<InMemoryStore>) -> CliResult<Mapper> {
    let definitions = read_definitions(schema)?;
    debug!(path = %schema.display(), types = definitions.len(), "schema loaded");
    let mapper = definitions
        .into_iter()
        .fold(Mapper::builder(), MapperBuilder::entity)
        .store(store as Arc<dyn DocumentStore>)
        .build()?;
    Ok(mapper)
}

/// Inserts every document of a data file into `store`. Returns the number inserted.
pub fn load_data(path: &Path, store: &InMemoryStore) -> CliResult<usize> {
    let data = Document::from_json_str(&read_file(path)?)?;
    let mut inserted = 0;
    for (collection, documents) in data.iter() {
        let Some(documents) = documents.as_array() else {
            return Err(CliError::Data {
                path: path.to_path_buf(),
                message: format!("{collection} must map to an array of documents"),
            });
        };
        for document in documents {
            let Some(document) = document.as_document() else {
                return Err(CliError::Data {
                    path: path.to_path_buf(),
                    message: format!("{collection} contains a {}", document.kind()),
                });
            };
            store.insert_one(collection, document.clone())?;
            inserted += 1;
        }
    }
    debug!(path = %path.display(), inserted, "data loaded");
    Ok(inserted)
}

/// Parses `name=value` arguments into bindings.
///
/// Values are read as JSON when they parse (`2`, `4.5`, `true`, `"x"`) and
/// as text otherwise, so `--param c=Tobias` binds the text `Tobias`.
pub fn parse_bindings(params: &[String]) -> CliResult<Bindings> {
    let mut bindings = Bindings::new();
    for param in params {
        let Some((name, raw)) = param.split_once('=') else {
            return Err(CliError::Parameter(param.clone()));
        };
        let name = name.trim().trim_start_matches(':');
        if name.is_empty() {
            return Err(CliError::Parameter(param.clone()));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        bindings.bind(name, value);
    }
    Ok(bindings)
}

/// Renders a serializable report as pretty JSON.
pub fn to_json<T: Serialize>(report: &T) -> String {
    // Reports hold only strings, numbers and documents.
    serde_json::to_string_pretty(report).unwrap_or_default()
}
