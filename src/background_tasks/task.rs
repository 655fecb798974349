use super::context::TaskContext;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Whether a task may be halted by administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Required for the forum's correctness. Only process shutdown stops it.
    Critical,
    /// Eligible for administrative halt.
    #[default]
    Stoppable,
}

impl Criticality {
    pub fn is_stoppable(self) -> bool {
        matches!(self, Criticality::Stoppable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Critical => "critical",
            Criticality::Stoppable => "stoppable",
        }
    }
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When a task should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSchedule {
    /// Run a single time after `start_delay`, then stop.
    Once { start_delay: Duration },
    /// Run after `start_delay`, then again `run_period` after each run ends.
    Intermittent {
        start_delay: Duration,
        run_period: Duration,
    },
}

impl TaskSchedule {
    pub fn intermittent(start_delay: Duration, run_period: Duration) -> Self {
        TaskSchedule::Intermittent {
            start_delay,
            run_period,
        }
    }

    pub fn start_delay(&self) -> Duration {
        match self {
            TaskSchedule::Once { start_delay } => *start_delay,
            TaskSchedule::Intermittent { start_delay, .. } => *start_delay,
        }
    }

    /// Time between the end of one run and the start of the next, if the
    /// task repeats at all.
    pub fn run_period(&self) -> Option<Duration> {
        match self {
            TaskSchedule::Once { .. } => None,
            TaskSchedule::Intermittent { run_period, .. } => Some(*run_period),
        }
    }
}

/// Errors a task can return from a single run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Execution failed: {0:#}")]
    ExecutionFailed(#[from] anyhow::Error),

    #[error("Task was cancelled")]
    Cancelled,
}

/// Trait for background tasks.
///
/// A task only describes one unit of work; timing, failure containment and
/// the stop protocol are handled by the runner the registry spawns for it.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
    /// Unique identifier for this task, used for registry lookup and logging.
    fn name(&self) -> &str;

    /// Description of what this task does.
    fn description(&self) -> &str;

    /// When this task should be scheduled to run.
    fn schedule(&self) -> TaskSchedule;

    /// Critical tasks refuse administrative stop requests.
    fn criticality(&self) -> Criticality {
        Criticality::Stoppable
    }

    /// Whether administrative tooling may halt this task.
    fn is_stoppable(&self) -> bool {
        self.criticality().is_stoppable()
    }

    /// Perform one unit of work.
    ///
    /// Long-running work should call `ctx.check_cancelled()` between
    /// sub-units and return early with `TaskError::Cancelled` when a stop was
    /// requested. Errors and panics never escape the runner.
    async fn run_once(&self, ctx: &TaskContext) -> Result<(), TaskError>;
}
