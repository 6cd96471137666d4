use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use self::dictionary::{DictionaryConfig, builtin_dictionaries};
use self::extract::ExtractConfig;
use self::lookup::LookupConfig;
use self::network::NetworkConfig;

pub mod dictionary;
pub mod extract;
pub mod lookup;
pub mod network;

pub const DEFAULT_DICTIONARY: &str = "concised";

fn default_storage_path() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".openclaw")
        .join("dictionaries")
}

fn default_auto_update_interval_days() -> u32 {
    30
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Root holding `metadata.json` and every dataset generation
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_auto_update_interval_days")]
    pub auto_update_interval_days: u32,

    pub network: NetworkConfig,
    pub extract: ExtractConfig,
    pub lookup: LookupConfig,

    #[serde(default = "builtin_dictionaries")]
    pub dictionaries: BTreeMap<String, DictionaryConfig>,
}

impl Config {
    pub fn new() -> Self {
        let storage_path = env::var_os("TWDICT_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_path);

        let auto_update_interval_days = env::var("TWDICT_AUTO_UPDATE_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_auto_update_interval_days);

        Config {
            storage_path,
            auto_update_interval_days,

            network: NetworkConfig::new(),
            extract: ExtractConfig::default(),
            lookup: LookupConfig::default(),

            dictionaries: builtin_dictionaries(),
        }
    }

    /// Fresh defaults rooted at `storage_path`, ignoring the environment.
    pub fn with_storage(storage_path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: storage_path.into(),
            ..Config::default()
        }
    }

    pub fn dictionary(&self, id: &str) -> Option<&DictionaryConfig> {
        self.dictionaries.get(id)
    }

    pub fn enabled_dictionaries(&self) -> impl Iterator<Item = (&str, &DictionaryConfig)> {
        self.dictionaries
            .iter()
            .filter(|(_, dict)| dict.enabled)
            .map(|(id, dict)| (id.as_str(), dict))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.storage_path.join("metadata.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: default_storage_path(),
            auto_update_interval_days: default_auto_update_interval_days(),
            network: NetworkConfig::default(),
            extract: ExtractConfig::default(),
            lookup: LookupConfig::default(),
            dictionaries: builtin_dictionaries(),
        }
    }
}
