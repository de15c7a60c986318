//! Error types for the pipeline stages.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("corrupt archive {path:?}: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{file:?} is missing expected column `{column}`")]
    MissingColumn { file: PathBuf, column: String },

    #[error("{file:?} has an empty header at column {index}")]
    EmptyHeader { file: PathBuf, index: usize },

    #[error("series `{series}` ({file:?}) and `{previous}` ({previous_file:?}) both map to `{name}`")]
    SeriesNameCollision {
        name: String,
        series: String,
        file: PathBuf,
        previous: String,
        previous_file: PathBuf,
    },

    #[error("classification lookup {file:?} lists code `{code}` more than once")]
    DuplicateLookupCode { file: PathBuf, code: String },

    #[error("column `{column}` of relation `{relation}` has no destination type")]
    UnmappedColumnType { relation: String, column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("store error on relation `{relation}` ({file:?}): {source}")]
    Store {
        relation: String,
        file: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl EtlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
