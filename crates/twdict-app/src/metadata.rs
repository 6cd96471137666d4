use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use twdict_types::{DatasetVersion, UpdateMetadata};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not valid metadata: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `metadata.json`: dictionary id -> active dataset generation.
///
/// Writes replace the whole file through a temp file in the same directory,
/// so readers see either the old or the new document.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as empty metadata.
    pub fn load(&self) -> Result<UpdateMetadata, MetadataError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(UpdateMetadata::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_slice(&data).map_err(|source| MetadataError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn current(&self, dictionary_id: &str) -> Result<Option<DatasetVersion>, MetadataError> {
        Ok(self
            .load()?
            .get(dictionary_id)
            .map(|entry| DatasetVersion::from_entry(dictionary_id, entry)))
    }

    /// Point `version.dictionary_id` at `version`, keeping other entries.
    pub fn activate(&self, version: &DatasetVersion) -> Result<(), MetadataError> {
        let mut metadata = self.load()?;
        metadata.insert(version.dictionary_id.clone(), version.to_entry());
        self.write(&metadata)
    }

    fn write(&self, metadata: &UpdateMetadata) -> Result<(), MetadataError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        let json = serde_json::to_vec_pretty(metadata).map_err(|source| MetadataError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        tmp.write_all(&json).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::debug!("Wrote {}", self.path.display());
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> MetadataError {
        MetadataError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
