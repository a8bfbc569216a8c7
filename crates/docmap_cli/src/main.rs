//! docmap CLI
//!
//! Command-line tools for docmap schemas and queries.
//!
//! # Commands
//!
//! - `translate` - Translate a query into a native filter
//! - `query` - Run a translated or native query against a JSON data file
//! - `schema` - Show how every type maps to collections and document keys

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::query::QueryInput;
use commands::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docmap command-line tools.
#[derive(Parser)]
#[command(name = "docmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the schema file (a JSON array of entity definitions)
    #[arg(global = true, short, long)]
    schema: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a query into a native filter
    Translate {
        /// The query, e.g. "SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2"
        query: String,

        /// Parameter binding as name=value (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a query against a JSON data file
    Query {
        /// The query, or native query text with --native
        query: String,

        /// Data file: a JSON object mapping collection names to document arrays
        #[arg(short, long)]
        data: PathBuf,

        /// Pass the query to the store verbatim
        #[arg(short, long)]
        native: bool,

        /// Type native query results decode as
        #[arg(short, long)]
        entity: Option<String>,

        /// Parameter binding as name=value (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Fail unless exactly one document matches
        #[arg(long)]
        single: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show how every type maps to collections and document keys
    Schema {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Translate {
            query,
            params,
            format,
        } => {
            let schema = cli.schema.ok_or("Schema file required for translate")?;
            commands::translate::run(&schema, &query, &params, OutputFormat::parse(&format)?)?;
        }
        Commands::Query {
            query,
            data,
            native,
            entity,
            params,
            single,
            format,
        } => {
            let schema = cli.schema.ok_or("Schema file required for query")?;
            let input = if native {
                QueryInput::Native {
                    text: query,
                    entity: entity.unwrap_or_default(),
                }
            } else {
                QueryInput::Translated {
                    text: query,
                    params,
                }
            };
            commands::query::run(&schema, &data, &input, single, OutputFormat::parse(&format)?)?;
        }
        Commands::Schema { format } => {
            let schema = cli.schema.ok_or("Schema file required for schema")?;
            commands::schema::run(&schema, OutputFormat::parse(&format)?)?;
        }
        Commands::Version => {
            println!("docmap CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
