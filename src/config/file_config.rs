use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub snapshot_path: Option<String>,
    pub shutdown_timeout_secs: Option<u64>,
    pub history_limit: Option<usize>,

    // Per-task configs
    pub search_index: Option<SearchIndexConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchIndexConfig {
    pub enabled: Option<bool>,
    pub start_delay_secs: Option<u64>,
    pub run_period_secs: Option<u64>,
    pub board_throttle_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
