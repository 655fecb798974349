//! Search index rebuild background task.
//!
//! This task periodically walks every board and pushes all of its messages
//! to the search indexer, pausing between boards so the indexer never sees
//! more than one batch per throttle interval.

use crate::background_tasks::{
    context::TaskContext,
    task::{BackgroundTask, TaskError, TaskSchedule},
};
use crate::forum::{BoardRepository, MessageRepository};
use crate::search::SearchIndexer;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const TASK_NAME: &str = "search_index_rebuild";

pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_RUN_PERIOD: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_BOARD_THROTTLE: Duration = Duration::from_secs(1);

/// Background task that rebuilds the search index board by board.
///
/// Every run is a full pass; a failure on one board abandons the rest of the
/// run and the next scheduled run starts over from the first board.
pub struct SearchIndexRebuildTask {
    boards: Arc<dyn BoardRepository>,
    messages: Arc<dyn MessageRepository>,
    indexer: Arc<dyn SearchIndexer>,
    start_delay: Duration,
    run_period: Duration,
    board_throttle: Duration,
}

impl SearchIndexRebuildTask {
    /// Create a new SearchIndexRebuildTask with the default timing.
    pub fn new(
        boards: Arc<dyn BoardRepository>,
        messages: Arc<dyn MessageRepository>,
        indexer: Arc<dyn SearchIndexer>,
    ) -> Self {
        Self {
            boards,
            messages,
            indexer,
            start_delay: DEFAULT_START_DELAY,
            run_period: DEFAULT_RUN_PERIOD,
            board_throttle: DEFAULT_BOARD_THROTTLE,
        }
    }

    pub fn with_timing(mut self, start_delay: Duration, run_period: Duration) -> Self {
        self.start_delay = start_delay;
        self.run_period = run_period;
        self
    }

    pub fn with_board_throttle(mut self, board_throttle: Duration) -> Self {
        self.board_throttle = board_throttle;
        self
    }
}

#[async_trait]
impl BackgroundTask for SearchIndexRebuildTask {
    fn name(&self) -> &str {
        TASK_NAME
    }

    fn description(&self) -> &str {
        "Rebuild the search index from every board's messages"
    }

    fn schedule(&self) -> TaskSchedule {
        TaskSchedule::intermittent(self.start_delay, self.run_period)
    }

    async fn run_once(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        let board_ids = self
            .boards
            .list_boards()
            .await
            .context("Failed to list boards")?;

        info!("Rebuilding search index for {} boards", board_ids.len());

        let mut indexed = 0usize;
        for board_id in &board_ids {
            ctx.check_cancelled()?;

            let messages = self
                .messages
                .messages_by_board(*board_id)
                .await
                .with_context(|| format!("Failed to fetch messages for board {}", board_id))?;

            self.indexer
                .add_or_update(&messages)
                .await
                .with_context(|| format!("Failed to index messages for board {}", board_id))?;

            indexed += messages.len();
            debug!("Indexed {} messages for board {}", messages.len(), board_id);

            // Caps the indexer's load; runs to completion even when a stop is pending.
            tokio::time::sleep(self.board_throttle).await;
        }

        info!(
            "Search index rebuild complete: {} boards, {} messages",
            board_ids.len(),
            indexed
        );
        Ok(())
    }
}
