use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One dictionary entry as parsed from a data row.
///
/// `pronunciations` and `definitions` are positionally aligned (one pair per
/// sense) and always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    pub headword: String,
    pub pronunciations: Vec<String>,
    pub part_of_speech: Option<String>,
    pub definitions: Vec<String>,
    pub examples: Vec<String>,
    pub extra: Option<String>,
}

impl DictionaryRecord {
    /// Iterate `(pronunciation, definition)` pairs.
    pub fn senses(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pronunciations
            .iter()
            .map(String::as_str)
            .zip(self.definitions.iter().map(String::as_str))
    }
}

/// One on-disk dataset generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetVersion {
    pub dictionary_id: String,
    /// Publisher tag, `YYYYMMDD`.
    pub version_tag: String,
    pub downloaded_at: DateTime<Utc>,
    pub data_file_path: PathBuf,
}

impl DatasetVersion {
    pub fn from_entry(dictionary_id: &str, entry: &MetadataEntry) -> Self {
        Self {
            dictionary_id: dictionary_id.to_string(),
            version_tag: entry.version.clone(),
            downloaded_at: entry.downloaded_at,
            data_file_path: entry.path.join(&entry.filename),
        }
    }

    pub fn to_entry(&self) -> MetadataEntry {
        let path = self
            .data_file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let filename = self
            .data_file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        MetadataEntry {
            version: self.version_tag.clone(),
            downloaded_at: self.downloaded_at,
            path,
            filename,
        }
    }
}

/// Persisted form of a [`DatasetVersion`] inside `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub version: String,
    pub downloaded_at: DateTime<Utc>,
    pub path: PathBuf,
    pub filename: String,
}

/// Dictionary id -> currently active dataset.
pub type UpdateMetadata = BTreeMap<String, MetadataEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    #[default]
    Brief,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sense {
    pub pronunciation: String,
    pub definition: String,
}

/// A record rendered for the caller at a given [`DetailLevel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub headword: String,
    pub senses: Vec<Sense>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl EntryView {
    pub fn render(record: &DictionaryRecord, detail: DetailLevel) -> Self {
        let senses = record
            .senses()
            .map(|(pronunciation, definition)| Sense {
                pronunciation: pronunciation.to_string(),
                definition: definition.to_string(),
            })
            .collect();

        match detail {
            DetailLevel::Brief => Self {
                headword: record.headword.clone(),
                senses,
                part_of_speech: None,
                examples: None,
                extra: None,
            },
            DetailLevel::Full => Self {
                headword: record.headword.clone(),
                senses,
                part_of_speech: record.part_of_speech.clone(),
                examples: Some(record.examples.clone()),
                extra: record.extra.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub headword: String,
    pub distance: usize,
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResponse {
    pub dictionary_id: String,
    pub query: String,
    pub match_type: MatchType,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    UpToDate,
    Updated,
}

/// Result of one update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub dictionary_id: String,
    pub outcome: UpdateOutcome,
    pub previous_version: Option<String>,
    pub remote_version: String,
    pub active_version: Option<String>,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    NotInstalled,
    UpToDate,
    UpdateAvailable,
    NewerThanRemote,
}

impl VersionStatus {
    pub fn compare(local: Option<&str>, remote: &str) -> Self {
        match local {
            None => VersionStatus::NotInstalled,
            Some(local) if local == remote => VersionStatus::UpToDate,
            Some(local) if local < remote => VersionStatus::UpdateAvailable,
            Some(_) => VersionStatus::NewerThanRemote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCheck {
    pub dictionary_id: String,
    pub local_version: Option<String>,
    pub latest_version: String,
    pub status: VersionStatus,
    pub update_available: bool,
    pub checked_at: DateTime<Utc>,
}

impl VersionCheck {
    pub fn new(dictionary_id: &str, local_version: Option<String>, latest_version: String) -> Self {
        let status = VersionStatus::compare(local_version.as_deref(), &latest_version);
        Self {
            dictionary_id: dictionary_id.to_string(),
            local_version,
            latest_version,
            status,
            update_available: matches!(status, VersionStatus::UpdateAvailable),
            checked_at: Utc::now(),
        }
    }
}

/// A dictionary whose check could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub dictionary_id: String,
    pub error: String,
}

/// Result of checking every installed dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub checked_at: DateTime<Utc>,
    pub dictionaries: Vec<VersionCheck>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CheckFailure>,
    pub updates_available: bool,
}
