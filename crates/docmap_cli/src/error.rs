//! CLI error type.

use docmap_core::CoreError;
use docmap_document::DocumentError;
use docmap_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A schema file is not a JSON array of definitions.
    #[error("invalid schema {path}: {source}")]
    Schema {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// A data file does not have the expected shape.
    #[error("invalid data file {path}: {message}")]
    Data {
        /// The file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A `--param` argument is not `name=value`.
    #[error("invalid parameter {0:?}; expected name=value")]
    Parameter(String),

    /// An unknown `--format` value.
    #[error("unknown output format {0:?}; expected text or json")]
    Format(String),

    /// A native query was given without `--entity`.
    #[error("native queries need --entity to decode results")]
    MissingEntity,

    /// The mapper rejected the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A document could not be read.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The store rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}
