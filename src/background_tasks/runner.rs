use super::context::TaskContext;
use super::task::{BackgroundTask, TaskError};
use crate::metrics;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify, RwLock};
use tracing::{debug, error, info};

/// Lifecycle state of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Registered, runner not started yet.
    Created,
    /// Waiting for the start delay.
    Delayed,
    /// Exactly one run in progress.
    Running,
    /// Waiting for the run period after a run.
    Sleeping,
    /// Terminal.
    Stopped,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Delayed => "delayed",
            TaskState::Running => "running",
            TaskState::Sleeping => "sleeping",
            TaskState::Stopped => "stopped",
        }
    }
}

/// Outcome of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
    Panicked,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Panicked => "panicked",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Panicked)
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Schedule,
    Manual,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Schedule => "schedule",
            RunTrigger::Manual => "manual",
        }
    }
}

/// A finished run of a task.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub triggered_by: RunTrigger,
}

/// Run bookkeeping shared between a runner and the registry.
#[derive(Debug)]
pub(crate) struct RunLedger {
    /// Most recent run first.
    runs: VecDeque<TaskRun>,
    limit: usize,
    pub(crate) run_count: u64,
    pub(crate) failure_count: u64,
    pub(crate) next_run_at: Option<DateTime<Utc>>,
}

impl RunLedger {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            runs: VecDeque::new(),
            limit,
            run_count: 0,
            failure_count: 0,
            next_run_at: None,
        }
    }

    pub(crate) fn record(&mut self, run: TaskRun) {
        self.run_count += 1;
        if run.status.is_failure() {
            self.failure_count += 1;
        }
        self.runs.push_front(run);
        self.runs.truncate(self.limit);
    }

    pub(crate) fn last_run(&self) -> Option<&TaskRun> {
        self.runs.front()
    }

    pub(crate) fn recent(&self, limit: usize) -> Vec<TaskRun> {
        self.runs.iter().take(limit).cloned().collect()
    }
}

/// Drives one task through its schedule.
///
/// The runner owns the task's single execution slot: it awaits each run
/// before starting its period timer, so runs of the same task never overlap.
pub(crate) struct TaskRunner {
    task: Arc<dyn BackgroundTask>,
    ctx: TaskContext,
    state: Arc<watch::Sender<TaskState>>,
    ledger: Arc<RwLock<RunLedger>>,
    trigger: Arc<Notify>,
}

impl TaskRunner {
    pub(crate) fn new(
        task: Arc<dyn BackgroundTask>,
        ctx: TaskContext,
        state: Arc<watch::Sender<TaskState>>,
        ledger: Arc<RwLock<RunLedger>>,
        trigger: Arc<Notify>,
    ) -> Self {
        Self {
            task,
            ctx,
            state,
            ledger,
            trigger,
        }
    }

    /// Main runner loop. Returns once the task reached `Stopped`.
    pub(crate) async fn run(self) {
        let schedule = self.task.schedule();

        self.state.send_replace(TaskState::Delayed);
        debug!(
            "Task {} waiting {:?} before first run",
            self.ctx.task_name(),
            schedule.start_delay()
        );

        let mut next = self.wait(schedule.start_delay()).await;
        while let Some(triggered_by) = next {
            self.execute(triggered_by).await;

            let Some(period) = schedule.run_period() else {
                break;
            };
            if self.ctx.is_cancelled() {
                break;
            }

            // Triggers are refused while Running, so a stored permit is stale.
            let _ = self.trigger.notified().now_or_never();
            self.state.send_replace(TaskState::Sleeping);
            next = self.wait(period).await;
        }

        self.ledger.write().await.next_run_at = None;
        self.state.send_replace(TaskState::Stopped);
        info!("Task {} stopped", self.ctx.task_name());
    }

    /// Wait for `duration`, a manual trigger, or a stop request (`None`).
    async fn wait(&self, duration: Duration) -> Option<RunTrigger> {
        // None when the wait ends past the last representable date.
        let next_run_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta));
        self.ledger.write().await.next_run_at = next_run_at;

        tokio::select! {
            biased;
            _ = self.ctx.cancellation_token.cancelled() => None,
            _ = self.trigger.notified() => Some(RunTrigger::Manual),
            _ = tokio::time::sleep(duration) => Some(RunTrigger::Schedule),
        }
    }

    /// Perform one run, containing any error or panic it raises.
    async fn execute(&self, triggered_by: RunTrigger) {
        let task_name = self.ctx.task_name();

        self.ledger.write().await.next_run_at = None;
        self.state.send_replace(TaskState::Running);
        metrics::set_task_running(task_name, true);

        info!(
            "Starting task: {} (triggered_by: {})",
            task_name,
            triggered_by.as_str()
        );

        let started_at = Utc::now();
        let start_time = Instant::now();
        let result = AssertUnwindSafe(self.task.run_once(&self.ctx))
            .catch_unwind()
            .await;
        let elapsed = start_time.elapsed();

        let (status, error_message) = match result {
            Ok(Ok(())) => {
                info!("Task {} completed successfully in {:?}", task_name, elapsed);
                (RunStatus::Completed, None)
            }
            Ok(Err(TaskError::Cancelled)) => {
                info!("Task {} was cancelled after {:?}", task_name, elapsed);
                (RunStatus::Cancelled, Some("Cancelled".to_string()))
            }
            Ok(Err(e)) => {
                error!("Error in {} task after {:?}: {}", task_name, elapsed, e);
                (RunStatus::Failed, Some(e.to_string()))
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!("Task {} panicked after {:?}: {}", task_name, elapsed, msg);
                (RunStatus::Panicked, Some(format!("Task panic: {}", msg)))
            }
        };

        metrics::record_task_run(task_name, status.as_str(), elapsed);
        metrics::set_task_running(task_name, false);

        self.ledger.write().await.record(TaskRun {
            started_at,
            finished_at: Utc::now(),
            status,
            error_message,
            triggered_by,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
