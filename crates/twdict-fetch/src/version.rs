use regex::Regex;

/// Highest version tag matched by `pattern` anywhere in `page`.
///
/// The first capture group is the tag; a pattern without groups uses the
/// whole match. Tags are `YYYYMMDD`, so the string maximum is the newest.
pub fn highest_version(page: &str, pattern: &str) -> Result<Option<String>, regex::Error> {
    let regex = Regex::new(pattern)?;

    let latest = regex
        .captures_iter(page)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str())
        .max()
        .map(str::to_string);

    Ok(latest)
}
