use std::path::PathBuf;

use crate::error::ExtractError;

/// Resolve an archive entry name to a path relative to the extraction root.
///
/// Both separators are accepted. `.` segments are dropped and `..` pops the
/// previous segment; popping past the root is a traversal. Absolute names,
/// drive prefixes and NUL bytes are rejected outright. Returns `None` for
/// names that resolve to the root itself.
pub fn sanitize_entry_name(name: &str) -> Result<Option<PathBuf>, ExtractError> {
    let segments = resolve(&[], name).ok_or_else(|| traversal(name))?;

    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(segments.iter().collect()))
}

/// Whether a symlink stored at `entry` pointing to `target` stays inside the
/// extraction root.
pub fn symlink_stays_inside(entry: &str, target: &str) -> bool {
    let Some(mut base) = resolve(&[], entry) else {
        return false;
    };
    // Relative targets resolve against the link's parent directory
    base.pop();
    resolve(&base, target).is_some()
}

fn resolve<'a>(base: &[&'a str], name: &'a str) -> Option<Vec<&'a str>> {
    if name.contains('\0') || is_absolute(name) {
        return None;
    }

    let mut segments = base.to_vec();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments)
}

fn is_absolute(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }
    // `C:` style drive prefix
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

fn traversal(name: &str) -> ExtractError {
    ExtractError::PathTraversal {
        entry: name.to_string(),
    }
}
