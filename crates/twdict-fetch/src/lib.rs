use std::path::Path;

use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use twdict_config::dictionary::SourceConfig;

pub mod error;
pub mod http;
pub mod retry;
pub mod version;

pub use error::FetchError;
pub use http::HttpSource;

/// Provides the newest published version tag of a dictionary
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    async fn latest_version(
        &self,
        dictionary_id: &str,
        source: &SourceConfig,
    ) -> Result<String, FetchError>;
}

/// Downloads archives to local temporary files
#[async_trait::async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` into a temp file created under `temp_dir`.
    ///
    /// The returned file is deleted when dropped unless the caller persists it.
    async fn fetch(
        &self,
        url: &str,
        temp_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DownloadedArchive, FetchError>;
}

#[derive(Debug)]
pub struct DownloadedArchive {
    pub file: NamedTempFile,
    /// Last path segment of the url, e.g. `dict_concised_2014_20251229.zip`
    pub filename: String,
    pub bytes: u64,
}

impl DownloadedArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Filename without its extension. The publisher wraps the dataset in a
    /// directory of this name.
    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }
}

/// Last non-empty path segment of `url`, ignoring query and fragment.
pub fn archive_filename(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}
