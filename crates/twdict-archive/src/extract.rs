use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use twdict_config::extract::ExtractConfig;

use crate::error::ExtractError;
use crate::path::{sanitize_entry_name, symlink_stays_inside};

/// Symlink targets longer than this are treated as corrupt
const MAX_LINK_TARGET: u64 = 4096;

/// Extracts zip archives into a fresh staging directory.
///
/// Every entry is validated before the first byte is written, so a rejected
/// archive leaves nothing behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeExtractor {
    limits: ExtractConfig,
}

/// A fully extracted archive. Dropping it deletes the staging directory.
#[derive(Debug)]
pub struct StagedExtraction {
    dir: TempDir,
    files: Vec<PathBuf>,
    bytes_written: u64,
}

impl StagedExtraction {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Extracted regular files, relative to [`Self::path`], in archive order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

enum Planned {
    Dir(PathBuf),
    File { index: usize, path: PathBuf, name: String },
}

impl SafeExtractor {
    pub fn new(limits: ExtractConfig) -> Self {
        Self { limits }
    }

    pub fn extract_file(
        &self,
        archive: &Path,
        staging_parent: &Path,
        cancel: &CancellationToken,
    ) -> Result<StagedExtraction, ExtractError> {
        let file = File::open(archive)?;
        self.extract_until(BufReader::new(file), staging_parent, cancel)
    }

    /// Extract into a new `.staging-*` directory under `staging_parent`.
    pub fn extract<R: Read + Seek>(
        &self,
        reader: R,
        staging_parent: &Path,
    ) -> Result<StagedExtraction, ExtractError> {
        self.extract_until(reader, staging_parent, &CancellationToken::new())
    }

    /// Like [`Self::extract`], checking `cancel` before each entry is
    /// written. A cancelled extraction removes its staging directory before
    /// returning.
    pub fn extract_until<R: Read + Seek>(
        &self,
        reader: R,
        staging_parent: &Path,
        cancel: &CancellationToken,
    ) -> Result<StagedExtraction, ExtractError> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let plan = self.validate(&mut archive)?;

        fs::create_dir_all(staging_parent)?;
        let dir = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(staging_parent)?;

        // On any error below `dir` is dropped and the partial tree removed
        let mut files = Vec::new();
        let mut bytes_written = 0u64;

        for planned in plan {
            if cancel.is_cancelled() {
                tracing::debug!("Extraction into {} cancelled", dir.path().display());
                return Err(ExtractError::Cancelled);
            }

            match planned {
                Planned::Dir(path) => fs::create_dir_all(dir.path().join(path))?,
                Planned::File { index, path, name } => {
                    let target = dir.path().join(&path);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }

                    let mut entry = archive.by_index(index)?;
                    let remaining = self.limits.max_total_bytes.saturating_sub(bytes_written);
                    let limit = self.limits.max_entry_bytes.min(remaining);

                    let written = copy_limited(&mut entry, &target, limit).map_err(|e| {
                        if e.kind() == io::ErrorKind::FileTooLarge {
                            self.size_error(&name, limit, remaining)
                        } else {
                            ExtractError::Io(e)
                        }
                    })?;

                    bytes_written += written;
                    files.push(path);
                }
            }
        }

        tracing::debug!(
            "Extracted {} files ({} bytes) into {}",
            files.len(),
            bytes_written,
            dir.path().display()
        );

        Ok(StagedExtraction {
            dir,
            files,
            bytes_written,
        })
    }

    /// Check every entry header and build the write plan.
    fn validate<R: Read + Seek>(
        &self,
        archive: &mut zip::ZipArchive<R>,
    ) -> Result<Vec<Planned>, ExtractError> {
        if archive.len() > self.limits.max_entries {
            return Err(ExtractError::TooManyEntries {
                count: archive.len(),
                limit: self.limits.max_entries,
            });
        }

        let mut plan = Vec::with_capacity(archive.len());
        let mut declared_total = 0u64;

        for index in 0..archive.len() {
            let (name, is_dir, is_symlink, size) = {
                let entry = archive.by_index_raw(index)?;
                let name = entry.name().to_string();
                if entry.encrypted() {
                    return Err(ExtractError::EncryptedEntry { entry: name });
                }
                (name, entry.is_dir(), entry.is_symlink(), entry.size())
            };

            let Some(path) = sanitize_entry_name(&name)? else {
                continue;
            };

            if is_symlink {
                let mut target = String::new();
                archive
                    .by_index(index)?
                    .take(MAX_LINK_TARGET)
                    .read_to_string(&mut target)?;

                if !symlink_stays_inside(&name, &target) {
                    return Err(ExtractError::PathTraversal { entry: name });
                }
                tracing::warn!("Skipping symlink entry '{}' -> '{}'", name, target);
                continue;
            }

            if is_dir {
                plan.push(Planned::Dir(path));
                continue;
            }

            if size > self.limits.max_entry_bytes {
                return Err(ExtractError::OversizeEntry {
                    entry: name,
                    size,
                    limit: self.limits.max_entry_bytes,
                });
            }

            declared_total = declared_total.saturating_add(size);
            if declared_total > self.limits.max_total_bytes {
                return Err(ExtractError::TotalSizeExceeded {
                    limit: self.limits.max_total_bytes,
                });
            }

            plan.push(Planned::File { index, path, name });
        }

        Ok(plan)
    }

    fn size_error(&self, name: &str, limit: u64, remaining: u64) -> ExtractError {
        if limit == remaining && remaining < self.limits.max_entry_bytes {
            ExtractError::TotalSizeExceeded {
                limit: self.limits.max_total_bytes,
            }
        } else {
            ExtractError::OversizeEntry {
                entry: name.to_string(),
                size: limit.saturating_add(1),
                limit,
            }
        }
    }
}

/// Copy at most `limit` bytes. Headers can lie about sizes, so the
/// decompressed stream is bounded independently.
fn copy_limited(reader: &mut impl Read, target: &Path, limit: u64) -> io::Result<u64> {
    let out = File::create(target)?;
    let mut writer = BufWriter::with_capacity(128 * 1024, out);

    let written = io::copy(&mut reader.take(limit.saturating_add(1)), &mut writer)?;
    if written > limit {
        return Err(io::Error::new(
            io::ErrorKind::FileTooLarge,
            format!("{} exceeds {} bytes", target.display(), limit),
        ));
    }

    writer.flush()?;
    Ok(written)
}
