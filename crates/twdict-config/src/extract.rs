use serde::{Deserialize, Serialize};

fn default_max_entry_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_max_total_bytes() -> u64 {
    1024 * 1024 * 1024
}

fn default_max_entries() -> usize {
    10_000
}

/// Ceilings applied to every archive before anything is written.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ExtractConfig {
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: default_max_entry_bytes(),
            max_total_bytes: default_max_total_bytes(),
            max_entries: default_max_entries(),
        }
    }
}
