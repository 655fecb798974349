use super::runner::{TaskRun, TaskState};
use super::task::{Criticality, TaskSchedule};
use serde::Serialize;
use std::time::Duration;

/// Information about a registered task for administrative surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub name: String,
    pub description: String,
    pub criticality: Criticality,
    pub is_stoppable: bool,
    pub state: TaskState,
    pub schedule: TaskScheduleInfo,
    pub run_count: u64,
    pub failure_count: u64,
    pub last_run: Option<TaskRunInfo>,
    pub next_run_at: Option<String>,
}

/// Serializable schedule information.
#[derive(Debug, Clone, Serialize)]
pub struct TaskScheduleInfo {
    #[serde(rename = "type")]
    pub schedule_type: String,
    pub start_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_period_ms: Option<u64>,
}

impl From<TaskSchedule> for TaskScheduleInfo {
    fn from(schedule: TaskSchedule) -> Self {
        match schedule {
            TaskSchedule::Once { start_delay } => TaskScheduleInfo {
                schedule_type: "once".to_string(),
                start_delay_ms: millis(start_delay),
                run_period_ms: None,
            },
            TaskSchedule::Intermittent {
                start_delay,
                run_period,
            } => TaskScheduleInfo {
                schedule_type: "intermittent".to_string(),
                start_delay_ms: millis(start_delay),
                run_period_ms: Some(millis(run_period)),
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Serializable run information.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRunInfo {
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: i64,
    pub status: String,
    pub error_message: Option<String>,
    pub triggered_by: String,
}

impl From<TaskRun> for TaskRunInfo {
    fn from(run: TaskRun) -> Self {
        TaskRunInfo {
            started_at: run.started_at.to_rfc3339(),
            finished_at: run.finished_at.to_rfc3339(),
            duration_ms: (run.finished_at - run.started_at).num_milliseconds(),
            status: run.status.as_str().to_string(),
            error_message: run.error_message,
            triggered_by: run.triggered_by.as_str().to_string(),
        }
    }
}
