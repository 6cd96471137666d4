use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use twdict_config::Config;

/// Load the JSON config file named by `path` or `TWDICT_CONFIG`, falling
/// back to defaults with environment overrides when neither is set.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("TWDICT_CONFIG").map(PathBuf::from));

    let Some(path) = path else {
        return Ok(Config::new());
    };

    tracing::info!("Loading config from {}", path.display());
    let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}
