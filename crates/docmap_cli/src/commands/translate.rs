//! Translate command implementation.

use super::{build_mapper, parse_bindings, to_json, OutputFormat};
use crate::error::CliResult;
use docmap_document::Document;
use docmap_store::{Filter, InMemoryStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A translated query.
#[derive(Debug, Serialize)]
pub struct Translation {
    /// The query text as given.
    pub query: String,
    /// Selected entity type.
    pub entity: String,
    /// Collection the filter applies to.
    pub collection: String,
    /// Parameter names, in order of appearance.
    pub parameters: Vec<String>,
    /// The native filter document.
    pub filter: Document,
}

/// Translates `query` against the schema, binding `params`.
pub fn translate(schema: &Path, query: &str, params: &[String]) -> CliResult<Translation> {
    let mapper = build_mapper(schema, Arc::new(InMemoryStore::new()))?;
    let compiled = mapper.compile(query)?;
    let filter = match compiled.to_filter(&parse_bindings(params)?)? {
        Filter::Native(document) => document,
        _ => Document::new(),
    };
    Ok(Translation {
        query: query.to_string(),
        entity: compiled.entity_type().to_string(),
        collection: compiled.collection().to_string(),
        parameters: compiled.parameters().into_iter().map(str::to_string).collect(),
        filter,
    })
}

/// Runs the translate command.
pub fn run(schema: &Path, query: &str, params: &[String], format: OutputFormat) -> CliResult<()> {
    let translation = translate(schema, query, params)?;
    match format {
        OutputFormat::Json => println!("{}", to_json(&translation)),
        OutputFormat::Text => {
            println!("Entity:     {}", translation.entity);
            println!("Collection: {}", translation.collection);
            if !translation.parameters.is_empty() {
                println!("Parameters: {}", translation.parameters.join(", "));
            }
            println!("Filter:     {}", translation.filter);
            println!();
            println!("db.{}.find({})", translation.collection, translation.filter);
        }
    }
    Ok(())
}
