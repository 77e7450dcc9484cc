use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a focal mechanism map
#[derive(Debug, Error)]
pub enum FocalMapError {
    /// Reading or writing one of the pipeline files failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog parsing, filtering or CSV writing error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Embedded map configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cleaned catalog lacks one of the required columns
    #[error("Catalog is missing required column '{0}'")]
    MissingColumn(String),

    /// No usable magnitudes were found
    #[error("Catalog contains no magnitudes")]
    EmptyCatalog,

    /// Configuration error (bad project directory, malformed values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The gmt executable could not be started
    #[error("Could not start '{program}': {source}")]
    GmtNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A gmt module exited unsuccessfully
    #[error("gmt {module} failed ({status}): {stderr}")]
    Gmt {
        module: String,
        status: String,
        stderr: String,
    },
}

impl FocalMapError {
    /// Attach the offending path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FocalMapError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Type alias for Results using FocalMapError
pub type Result<T> = std::result::Result<T, FocalMapError>;
