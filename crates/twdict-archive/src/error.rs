use thiserror::Error;

/// Archive rejected or extraction aborted. The staging directory is gone by
/// the time any of these reaches the caller.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("entry '{entry}' resolves outside the extraction root")]
    PathTraversal { entry: String },

    #[error("entry '{entry}' is {size} bytes, limit is {limit}")]
    OversizeEntry { entry: String, size: u64, limit: u64 },

    #[error("archive has {count} entries, limit is {limit}")]
    TooManyEntries { count: usize, limit: usize },

    #[error("archive expands to more than {limit} bytes")]
    TotalSizeExceeded { limit: u64 },

    #[error("entry '{entry}' is encrypted")]
    EncryptedEntry { entry: String },

    #[error("extraction cancelled")]
    Cancelled,

    #[error("invalid zip archive: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),

    #[error("io error during extraction: {0}")]
    Io(#[from] std::io::Error),
}
