use super::task::TaskError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to tasks during execution.
///
/// Carries the task's name and the cancellation token the registry uses for
/// stop requests and shutdown.
#[derive(Clone)]
pub struct TaskContext {
    /// Token to check for stop/shutdown requests.
    pub cancellation_token: CancellationToken,

    task_name: Arc<str>,
}

impl TaskContext {
    /// Create a new task context.
    pub fn new(cancellation_token: CancellationToken, task_name: &str) -> Self {
        Self {
            cancellation_token,
            task_name: Arc::from(task_name),
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Check if a stop has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Returns `TaskError::Cancelled` once a stop has been requested.
    ///
    /// Meant to be called at iteration boundaries with `?`.
    pub fn check_cancelled(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}
