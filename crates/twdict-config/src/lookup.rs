use serde::{Deserialize, Serialize};

fn default_single_char_max_distance() -> usize {
    1
}

fn default_multi_char_max_distance() -> usize {
    2
}

fn default_fuzzy_limit() -> usize {
    5
}

fn default_prefix_limit() -> usize {
    10
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct LookupConfig {
    #[serde(default = "default_single_char_max_distance")]
    pub single_char_max_distance: usize,
    #[serde(default = "default_multi_char_max_distance")]
    pub multi_char_max_distance: usize,
    #[serde(default = "default_fuzzy_limit")]
    pub fuzzy_limit: usize,
    #[serde(default = "default_prefix_limit")]
    pub prefix_limit: usize,
}

impl LookupConfig {
    /// Edit-distance bound for a query of `char_len` characters.
    pub fn max_distance_for(&self, char_len: usize) -> usize {
        if char_len <= 1 {
            self.single_char_max_distance
        } else {
            self.multi_char_max_distance
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            single_char_max_distance: default_single_char_max_distance(),
            multi_char_max_distance: default_multi_char_max_distance(),
            fuzzy_limit: default_fuzzy_limit(),
            prefix_limit: default_prefix_limit(),
        }
    }
}
