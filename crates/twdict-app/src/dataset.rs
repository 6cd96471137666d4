//! On-disk dataset generations: locating the data file inside a staged
//! extraction and promoting it to `<storage>/<id>_<version>`.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use twdict_core::error::ParseError;

/// Archiver metadata such as `__MACOSX/` or `.DS_Store`
fn is_archiver_noise(name: &OsStr) -> bool {
    name == "__MACOSX" || name.to_string_lossy().starts_with('.')
}

/// Directory holding the dataset inside a staged extraction.
///
/// A lone top-level directory must be named `expected_dir` (the archive
/// name without extension). Anything else is read from the staging root.
/// Archiver metadata entries are ignored.
pub fn data_root(staged: &Path, expected_dir: &str) -> Result<PathBuf, ParseError> {
    let mut dirs = Vec::new();
    let mut has_files = false;

    for entry in fs::read_dir(staged).map_err(|e| ParseError::io(staged, e))? {
        let entry = entry.map_err(|e| ParseError::io(staged, e))?;
        if is_archiver_noise(&entry.file_name()) {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| ParseError::io(&entry.path(), e))?;
        if file_type.is_dir() {
            dirs.push(entry.file_name());
        } else {
            has_files = true;
        }
    }

    match (dirs.as_slice(), has_files) {
        ([only], false) if only.as_os_str() == expected_dir => Ok(staged.join(only)),
        ([only], false) => Err(ParseError::UnexpectedLayout(format!(
            "archive wraps its data in '{}', expected '{}'",
            only.to_string_lossy(),
            expected_dir
        ))),
        _ => Ok(staged.to_path_buf()),
    }
}

/// Pick the data file inside `root`: `<archive_stem>.<ext>`, then the
/// configured name, then the first file with a supported extension by name.
pub fn find_data_file(
    root: &Path,
    archive_stem: &str,
    configured: &str,
    extensions: &[String],
) -> Result<String, ParseError> {
    let supported = |name: &str| {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    };

    let versioned = extensions.iter().map(|ext| format!("{archive_stem}.{ext}"));
    for candidate in versioned.chain([configured.to_string()]) {
        if !candidate.is_empty() && root.join(&candidate).is_file() {
            return Ok(candidate);
        }
    }

    let mut found: Vec<String> = fs::read_dir(root)
        .map_err(|e| ParseError::io(root, e))?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| supported(name))
        .collect();
    found.sort_unstable();

    found.into_iter().next().ok_or_else(|| {
        ParseError::UnexpectedLayout(format!(
            "no {} data file in {}",
            extensions.join("/"),
            root.display()
        ))
    })
}

/// Move a validated dataset to its versioned home and return the new path.
///
/// Existing generations are never overwritten: a repeat of the same version
/// gets a timestamp suffix. Source and target must share a filesystem.
pub fn promote(
    data_root: &Path,
    storage: &Path,
    dictionary_id: &str,
    version: &str,
) -> io::Result<PathBuf> {
    let mut target = storage.join(format!("{dictionary_id}_{version}"));
    if target.exists() {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        target = storage.join(format!("{dictionary_id}_{version}.{stamp}"));
    }

    fs::rename(data_root, &target)?;
    tracing::info!("Promoted dataset to {}", target.display());
    Ok(target)
}
