use super::context::TaskContext;
use super::info::{TaskInfo, TaskRunInfo};
use super::runner::{RunLedger, TaskRunner, TaskState};
use super::task::BackgroundTask;
use crate::metrics;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Number of finished runs kept per task unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Task already registered: {0}")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task is critical and cannot be stopped: {0}")]
    CriticalTask(String),

    #[error("Task is already running: {0}")]
    AlreadyRunning(String),

    #[error("Task is stopped: {0}")]
    TaskStopped(String),

    #[error("Task registry is shut down")]
    ShutDown,

    #[error("Task {name} did not stop within {timeout:?}")]
    ShutdownTimeout { name: String, timeout: Duration },
}

/// Outcome of [`TaskRegistry::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Tasks whose runner finished within the grace period.
    pub stopped: Vec<String>,
    /// One `ShutdownTimeout` per abandoned task.
    pub timed_out: Vec<RegistryError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.timed_out.is_empty()
    }
}

struct TaskEntry {
    task: Arc<dyn BackgroundTask>,
    cancel_token: CancellationToken,
    state: Arc<watch::Sender<TaskState>>,
    ledger: Arc<RwLock<RunLedger>>,
    trigger: Arc<Notify>,
    /// Taken by `shutdown`.
    handle: Option<JoinHandle<()>>,
}

impl TaskEntry {
    fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    async fn info(&self) -> TaskInfo {
        let ledger = self.ledger.read().await;
        TaskInfo {
            name: self.task.name().to_string(),
            description: self.task.description().to_string(),
            criticality: self.task.criticality(),
            is_stoppable: self.task.is_stoppable(),
            state: self.state(),
            schedule: self.task.schedule().into(),
            run_count: ledger.run_count,
            failure_count: ledger.failure_count,
            last_run: ledger.last_run().cloned().map(TaskRunInfo::from),
            next_run_at: ledger.next_run_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Owns every background task of the process.
///
/// Construct one at startup and hand out `Arc<TaskRegistry>` to whatever
/// needs scheduling control. Each task gets a child of the registry's
/// shutdown token, so cancelling that token stops everything.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskEntry>>,
    shutdown_token: CancellationToken,
    history_limit: usize,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new(shutdown_token: CancellationToken) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            shutdown_token,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` finished runs per task.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Register a task and start its runner.
    ///
    /// A name held by a live task is rejected with `DuplicateTask`. A name
    /// whose previous task already stopped is taken over by the new one.
    pub async fn register(&self, task: Arc<dyn BackgroundTask>) -> Result<(), RegistryError> {
        if self.shutdown_token.is_cancelled() {
            return Err(RegistryError::ShutDown);
        }

        let name = task.name().to_string();
        let mut tasks = self.tasks.write().await;

        if let Some(existing) = tasks.get(&name) {
            if existing.state() != TaskState::Stopped {
                return Err(RegistryError::DuplicateTask(name));
            }
            info!("Replacing stopped task: {}", name);
        }

        info!(
            "Registering task: {} - {} ({})",
            name,
            task.description(),
            task.criticality()
        );

        let cancel_token = self.shutdown_token.child_token();
        let (state_tx, _) = watch::channel(TaskState::Created);
        let state = Arc::new(state_tx);
        let ledger = Arc::new(RwLock::new(RunLedger::new(self.history_limit)));
        let trigger = Arc::new(Notify::new());

        let runner = TaskRunner::new(
            Arc::clone(&task),
            TaskContext::new(cancel_token.clone(), &name),
            Arc::clone(&state),
            Arc::clone(&ledger),
            Arc::clone(&trigger),
        );
        let handle = tokio::spawn(runner.run());

        tasks.insert(
            name,
            TaskEntry {
                task,
                cancel_token,
                state,
                ledger,
                trigger,
                handle: Some(handle),
            },
        );
        Ok(())
    }

    /// Names of the registered tasks that administrative action may halt.
    pub async fn stoppable_tasks(&self) -> BTreeSet<String> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .filter(|(_, entry)| entry.task.is_stoppable())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Ask a task to stop. A run in progress is allowed to finish.
    pub async fn stop(&self, name: &str) -> Result<(), RegistryError> {
        let tasks = self.tasks.read().await;
        let entry = tasks
            .get(name)
            .ok_or_else(|| RegistryError::TaskNotFound(name.to_string()))?;

        if !entry.task.is_stoppable() {
            warn!("Refusing to stop critical task: {}", name);
            return Err(RegistryError::CriticalTask(name.to_string()));
        }

        info!("Stopping task: {}", name);
        entry.cancel_token.cancel();
        Ok(())
    }

    /// Start a run now instead of waiting for the schedule.
    pub async fn trigger(&self, name: &str) -> Result<(), RegistryError> {
        let tasks = self.tasks.read().await;
        let entry = tasks
            .get(name)
            .ok_or_else(|| RegistryError::TaskNotFound(name.to_string()))?;

        // Holding the state lock keeps the runner from entering Running
        // between the check and the notify.
        let mut outcome = Ok(());
        entry.state.send_if_modified(|state| {
            outcome = match *state {
                TaskState::Running => Err(RegistryError::AlreadyRunning(name.to_string())),
                TaskState::Stopped => Err(RegistryError::TaskStopped(name.to_string())),
                _ if entry.cancel_token.is_cancelled() => {
                    Err(RegistryError::TaskStopped(name.to_string()))
                }
                _ => {
                    debug!("Manually triggering task: {}", name);
                    entry.trigger.notify_one();
                    Ok(())
                }
            };
            false
        });
        outcome
    }

    /// Current lifecycle state of a task.
    pub async fn task_state(&self, name: &str) -> Option<TaskState> {
        let tasks = self.tasks.read().await;
        tasks.get(name).map(|entry| entry.state())
    }

    /// Get the number of registered tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Get information about all registered tasks, sorted by name.
    pub async fn list_tasks(&self) -> Vec<TaskInfo> {
        let tasks = self.tasks.read().await;
        let mut infos = Vec::with_capacity(tasks.len());
        for entry in tasks.values() {
            infos.push(entry.info().await);
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Get information about a specific task.
    pub async fn get_task(&self, name: &str) -> Option<TaskInfo> {
        let tasks = self.tasks.read().await;
        match tasks.get(name) {
            Some(entry) => Some(entry.info().await),
            None => None,
        }
    }

    /// Most recent runs of a task, newest first.
    pub async fn task_history(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<TaskRunInfo>, RegistryError> {
        let tasks = self.tasks.read().await;
        let entry = tasks
            .get(name)
            .ok_or_else(|| RegistryError::TaskNotFound(name.to_string()))?;
        let ledger = entry.ledger.read().await;
        Ok(ledger
            .recent(limit)
            .into_iter()
            .map(TaskRunInfo::from)
            .collect())
    }

    /// Stop every task, critical ones included, waiting at most `timeout`
    /// for runs in progress to finish.
    ///
    /// Tasks still running at the deadline are abandoned: their runner is
    /// aborted, they are marked stopped and reported as `ShutdownTimeout`.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        info!("Shutting down task registry...");
        self.shutdown_token.cancel();

        let pending: Vec<(String, JoinHandle<()>, Arc<watch::Sender<TaskState>>)> = {
            let mut tasks = self.tasks.write().await;
            tasks
                .iter_mut()
                .filter_map(|(name, entry)| {
                    entry
                        .handle
                        .take()
                        .map(|handle| (name.clone(), handle, Arc::clone(&entry.state)))
                })
                .collect()
        };

        let deadline = tokio::time::Instant::now() + timeout;
        let waits = pending.into_iter().map(|(name, mut handle, state)| async move {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => Ok(name),
                Ok(Err(e)) => {
                    error!("Runner for task {} ended abnormally: {}", name, e);
                    state.send_replace(TaskState::Stopped);
                    Ok(name)
                }
                Err(_) => {
                    warn!(
                        "Task {} did not stop within {:?}, abandoning it",
                        name, timeout
                    );
                    handle.abort();
                    metrics::set_task_running(&name, false);
                    state.send_replace(TaskState::Stopped);
                    Err(RegistryError::ShutdownTimeout { name, timeout })
                }
            }
        });

        let mut report = ShutdownReport::default();
        for result in join_all(waits).await {
            match result {
                Ok(name) => report.stopped.push(name),
                Err(e) => report.timed_out.push(e),
            }
        }
        report.stopped.sort();

        info!(
            "Task registry shutdown complete: {} stopped, {} abandoned",
            report.stopped.len(),
            report.timed_out.len()
        );
        report
    }
}
