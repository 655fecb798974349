use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_tasks::background_tasks::tasks::SearchIndexRebuildTask;
use forum_tasks::background_tasks::{TaskRegistry, DEFAULT_HISTORY_LIMIT};
use forum_tasks::config::{AppConfig, CliConfig, FileConfig, DEFAULT_SHUTDOWN_TIMEOUT_SECS};
use forum_tasks::{metrics, InMemoryForum, MemorySearchIndex};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the JSON forum snapshot providing boards and messages.
    #[clap(value_parser = parse_path)]
    pub snapshot: Option<PathBuf>,

    /// Path to a TOML config file. Values there override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for running tasks when shutting down.
    #[clap(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,

    /// Number of finished runs kept per task.
    #[clap(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        snapshot_path: cli_args.snapshot,
        shutdown_timeout_secs: cli_args.shutdown_timeout_secs,
        history_limit: cli_args.history_limit,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    metrics::init_metrics();

    info!("Loading forum snapshot from {:?}...", config.snapshot_path);
    let forum = Arc::new(InMemoryForum::load(&config.snapshot_path)?);
    info!(
        "Loaded {} boards with {} messages",
        forum.board_count(),
        forum.message_count()
    );
    let search_index = Arc::new(MemorySearchIndex::new());

    let shutdown_token = CancellationToken::new();
    let registry = Arc::new(
        TaskRegistry::new(shutdown_token.clone()).with_history_limit(config.history_limit),
    );

    if config.search_index.enabled {
        let settings = &config.search_index;
        let task = SearchIndexRebuildTask::new(forum.clone(), forum.clone(), search_index.clone())
            .with_timing(settings.start_delay, settings.run_period)
            .with_board_throttle(settings.board_throttle);
        registry.register(Arc::new(task)).await?;
    } else {
        info!("Search index rebuild disabled by configuration");
    }

    info!(
        "Task engine running with {} tasks, press Ctrl-C to stop",
        registry.task_count().await
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown requested");
    let report = registry.shutdown(config.shutdown_timeout).await;
    for err in &report.timed_out {
        warn!("{}", err);
    }
    info!("Search index holds {} messages", search_index.len());
    tracing::debug!("Final metrics:\n{}", metrics::render());

    Ok(())
}
