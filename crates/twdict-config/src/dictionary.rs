use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const PUBLISHER_BASE: &str =
    "https://language.moe.gov.tw/001/Upload/Files/site_content/M0001/respub";

fn default_enabled() -> bool {
    true
}

/// Where a dictionary is published and how its files are named.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourceConfig {
    /// Download page scanned for the newest version tag
    pub page_url: String,
    /// Archive URL template, `{version}` is replaced by the tag
    pub archive_url: String,
    /// Regex whose first capture group is the 8-digit version tag
    pub version_pattern: String,
    /// Expected spreadsheet name inside the archive
    pub data_filename: String,
}

impl SourceConfig {
    /// Publisher layout shared by every MOE dictionary.
    pub fn moe(id: &str) -> Self {
        Self {
            page_url: format!("{PUBLISHER_BASE}/dict_{id}_download.html"),
            archive_url: format!("{PUBLISHER_BASE}/download/dict_{id}_2014_{{version}}.zip"),
            version_pattern: format!(r"dict_{id}_2014_(\d{{8}})"),
            data_filename: format!("dict_{id}_2014.xlsx"),
        }
    }

    pub fn archive_url_for(&self, version: &str) -> String {
        self.archive_url.replace("{version}", version)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DictionaryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Display name
    pub name: String,
    pub source: SourceConfig,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            name: String::new(),
            source: SourceConfig::default(),
        }
    }
}

impl DictionaryConfig {
    fn moe(id: &str, name: &str, enabled: bool) -> Self {
        Self {
            enabled,
            name: name.to_string(),
            source: SourceConfig::moe(id),
        }
    }
}

/// Dictionaries the publisher currently distributes.
pub fn builtin_dictionaries() -> BTreeMap<String, DictionaryConfig> {
    [
        ("concised", "國語辭典簡編本", true),
        ("revised", "重編國語辭典修訂本", false),
        ("idiom", "成語典", false),
        ("mini", "國語小字典", false),
    ]
    .into_iter()
    .map(|(id, name, enabled)| (id.to_string(), DictionaryConfig::moe(id, name, enabled)))
    .collect()
}
