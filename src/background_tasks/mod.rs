//! Background task scheduling and execution system.
//!
//! This module provides infrastructure for running periodic maintenance
//! tasks like search index rebuilds, isolated from request handling and from
//! each other's failures.

mod context;
mod info;
mod registry;
mod runner;
mod task;
pub mod tasks;

pub use context::TaskContext;
pub use info::{TaskInfo, TaskRunInfo, TaskScheduleInfo};
pub use registry::{RegistryError, ShutdownReport, TaskRegistry, DEFAULT_HISTORY_LIMIT};
pub use runner::{RunStatus, RunTrigger, TaskRun, TaskState};
pub use task::{BackgroundTask, Criticality, TaskError, TaskSchedule};
