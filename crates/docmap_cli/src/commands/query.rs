//! Query command implementation.

use super::{build_mapper, load_data, parse_bindings, to_json, OutputFormat};
use crate::error::{CliError, CliResult};
use docmap_core::{CoreResult, QuerySource, Record};
use docmap_document::Document;
use docmap_store::InMemoryStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// What to run.
#[derive(Debug, Clone)]
pub enum QueryInput {
    /// Query text, translated against the schema.
    Translated {
        /// The query text.
        text: String,
        /// `name=value` parameter bindings.
        params: Vec<String>,
    },
    /// Native query text passed to the store verbatim.
    Native {
        /// The native text, e.g. `db.ORDER.findOne({_id: "o-1"})`.
        text: String,
        /// Type the results decode as.
        entity: String,
    },
}

/// Results of a query run.
#[derive(Debug, Serialize)]
pub struct QueryReport {
    /// Type the results were decoded as.
    pub entity: String,
    /// Number of results.
    pub count: usize,
    /// The results, re-encoded through the schema.
    pub results: Vec<Document>,
}

/// Loads `data` into an in-memory store and runs `input` against it.
///
/// With `single`, fails unless exactly one document matches.
pub fn query(schema: &Path, data: &Path, input: &QueryInput, single: bool) -> CliResult<QueryReport> {
    let store = Arc::new(InMemoryStore::new());
    let mapper = build_mapper(schema, Arc::clone(&store))?;
    load_data(data, &store)?;

    let executor = mapper.executor();
    let (records, entity) = match input {
        QueryInput::Translated { text, params } => {
            let compiled = mapper.compile(text)?;
            let bindings = parse_bindings(params)?;
            let source = QuerySource::Compiled {
                query: &compiled,
                bindings: &bindings,
            };
            (collect(&executor, source, compiled.entity_type(), single)?, compiled.entity_type().to_string())
        }
        QueryInput::Native { text, entity } => {
            if entity.is_empty() {
                return Err(CliError::MissingEntity);
            }
            let source = QuerySource::Native(text);
            (collect(&executor, source, entity, single)?, entity.clone())
        }
    };

    let codec = mapper.codec();
    let results = records
        .iter()
        .map(|record| codec.encode(record))
        .collect::<CoreResult<Vec<_>>>()?;
    debug!(entity = %entity, count = results.len(), "query finished");
    Ok(QueryReport {
        entity,
        count: results.len(),
        results,
    })
}

fn collect(
    executor: &docmap_core::QueryExecutor<'_>,
    source: QuerySource<'_>,
    entity: &str,
    single: bool,
) -> CoreResult<Vec<Record>> {
    if single {
        Ok(vec![executor.single_result(source, entity)?])
    } else {
        executor.execute(source, entity)?.collect()
    }
}

/// Runs the query command.
pub fn run(
    schema: &Path,
    data: &Path,
    input: &QueryInput,
    single: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let report = query(schema, data, input, single)?;
    match format {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Text => {
            for document in &report.results {
                println!("{document}");
            }
            println!("{} {} result(s)", report.count, report.entity);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_core::CoreError;
    use docmap_document::Value;
    use docmap_testkit::{FixtureFiles, ITEMS_QUANTITY_QUERY};

    fn translated(text: &str) -> QueryInput {
        QueryInput::Translated {
            text: text.to_string(),
            params: Vec::new(),
        }
    }

    #[test]
    fn join_query_finds_the_order() {
        let files = FixtureFiles::sample();
        let report = query(
            &files.schema_path(),
            &files.data_path(),
            &translated(ITEMS_QUANTITY_QUERY),
            true,
        )
        .unwrap();

        assert_eq!(report.entity, "Order");
        assert_eq!(report.count, 1);
        let items = report.results[0].get("ITEMS").and_then(Value::as_array).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn native_query_needs_no_translation() {
        let files = FixtureFiles::sample();
        let input = QueryInput::Native {
            text: r#"db.ORDER.find({"ITEMS.QUANTITY": 2})"#.to_string(),
            entity: "Order".to_string(),
        };
        let report = query(&files.schema_path(), &files.data_path(), &input, false).unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(
            report.results[0].get("CUSTOMER").and_then(Value::as_text),
            Some("Tobias Trelle")
        );
    }

    #[test]
    fn native_query_without_entity_is_rejected() {
        let files = FixtureFiles::sample();
        let input = QueryInput::Native {
            text: "db.ORDER.find({})".to_string(),
            entity: String::new(),
        };
        assert!(matches!(
            query(&files.schema_path(), &files.data_path(), &input, false),
            Err(CliError::MissingEntity)
        ));
    }

    #[test]
    fn single_without_match_is_no_result() {
        let files = FixtureFiles::sample();
        let result = query(
            &files.schema_path(),
            &files.data_path(),
            &translated("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 9"),
            true,
        );
        assert!(matches!(result, Err(CliError::Core(CoreError::NoResult { .. }))));
    }

    #[test]
    fn list_without_match_is_empty() {
        let files = FixtureFiles::sample();
        let report = query(
            &files.schema_path(),
            &files.data_path(),
            &translated("SELECT o FROM Order o WHERE o.customer = 'nobody'"),
            false,
        )
        .unwrap();
        assert_eq!(report.count, 0);
        assert!(to_json(&report).contains(r#""results": []"#));
    }
}
