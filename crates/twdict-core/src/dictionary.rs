use std::path::Path;

use twdict_types::DictionaryRecord;

use crate::error::ParseError;
use crate::index::FuzzyMatch;

/// Read-only dictionary operations. Implementations are shared across
/// concurrent readers and never mutated after construction.
pub trait Dictionary: Send + Sync {
    /// All records whose headword equals `query`, in source row order
    fn lookup_exact(&self, query: &str) -> &[DictionaryRecord];

    /// Search dictionary with options
    fn search(&self, query: &str, options: &SearchOptions) -> Vec<FuzzyMatch<'_>>;

    /// Get dictionary metadata
    fn metadata(&self) -> DictionaryMetadata;
}

/// Turn a data file into records
pub trait DictionaryLoader: Send + Sync {
    /// Load records from file path
    fn load_from_file(&self, path: &Path) -> Result<Vec<DictionaryRecord>, ParseError>;

    /// Supported file extensions
    fn supported_formats(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub max_results: usize,
    pub mode: SearchMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            mode: SearchMode::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    Prefix,
    Fuzzy { max_distance: usize },
}

#[derive(Debug, Clone)]
pub struct DictionaryMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub language: String,
    pub entry_count: usize,
    pub headword_count: usize,
}
