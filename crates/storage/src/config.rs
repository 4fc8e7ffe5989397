use std::fs;
use std::path::Path;

use warehouse_core::StoreConfig;

use crate::store::PathStore;

pub fn load_config(path: &Path) -> anyhow::Result<StoreConfig> {
    let raw = fs::read_to_string(path)?;
    let config = StoreConfig::from_json_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid store config {}: {e}", path.display()))?;
    Ok(config)
}

/// Load a config file and open the store it describes.
pub fn open_store(path: &Path) -> anyhow::Result<PathStore> {
    PathStore::from_config(&load_config(path)?)
}
