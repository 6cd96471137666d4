use std::path::{Path, PathBuf};

use thiserror::Error;

/// The data file could not be turned into records.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a readable workbook: {0}")]
    Workbook(String),

    #[error("malformed sheet xml: {0}")]
    Xml(String),

    #[error("workbook has no worksheet")]
    MissingSheet,

    #[error("required column '{column}' not found in header {header:?}")]
    MissingColumn {
        column: &'static str,
        header: Vec<String>,
    },

    #[error("data file has no rows")]
    NoRows,

    #[error("unexpected dataset layout: {0}")]
    UnexpectedLayout(String),
}

impl ParseError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Negative lookup results. Never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no entry matches '{query}'")]
    NotFound { query: String },

    #[error("dictionary '{dictionary_id}' is not loaded, download it first")]
    NotLoaded { dictionary_id: String },
}
