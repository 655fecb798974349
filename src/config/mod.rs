mod file_config;

pub use file_config::{FileConfig, SearchIndexConfig};

use crate::background_tasks::tasks::search_index_rebuild::{
    DEFAULT_BOARD_THROTTLE, DEFAULT_RUN_PERIOD, DEFAULT_START_DELAY,
};
use crate::background_tasks::DEFAULT_HISTORY_LIMIT;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub snapshot_path: Option<PathBuf>,
    pub shutdown_timeout_secs: u64,
    pub history_limit: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub snapshot_path: PathBuf,
    pub shutdown_timeout: Duration,
    pub history_limit: usize,

    // Task configs (with defaults)
    pub search_index: SearchIndexSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let snapshot_path = file
            .snapshot_path
            .map(PathBuf::from)
            .or_else(|| cli.snapshot_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "snapshot_path must be specified on the command line or in config file"
                )
            })?;

        if !snapshot_path.exists() {
            bail!("Forum snapshot does not exist: {:?}", snapshot_path);
        }
        if !snapshot_path.is_file() {
            bail!("Forum snapshot is not a file: {:?}", snapshot_path);
        }

        let shutdown_timeout =
            Duration::from_secs(file.shutdown_timeout_secs.unwrap_or(cli.shutdown_timeout_secs));

        let history_limit = file.history_limit.unwrap_or(cli.history_limit);
        if history_limit == 0 {
            bail!("history_limit must be at least 1");
        }

        // Search index settings - merge file config with defaults
        let si_file = file.search_index.unwrap_or_default();
        let defaults = SearchIndexSettings::default();
        let search_index = SearchIndexSettings {
            enabled: si_file.enabled.unwrap_or(defaults.enabled),
            start_delay: si_file
                .start_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.start_delay),
            run_period: si_file
                .run_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.run_period),
            board_throttle: si_file
                .board_throttle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.board_throttle),
        };
        if search_index.run_period.is_zero() {
            bail!("search_index.run_period_secs must be greater than 0");
        }

        Ok(Self {
            snapshot_path,
            shutdown_timeout,
            history_limit,
            search_index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIndexSettings {
    pub enabled: bool,
    pub start_delay: Duration,
    pub run_period: Duration,
    pub board_throttle: Duration,
}

impl Default for SearchIndexSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay: DEFAULT_START_DELAY,
            run_period: DEFAULT_RUN_PERIOD,
            board_throttle: DEFAULT_BOARD_THROTTLE,
        }
    }
}
