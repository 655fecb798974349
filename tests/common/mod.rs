//! Common test infrastructure
//!
//! Fake collaborators and instrumented tasks shared by the end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeForum, RecordingIndexer};
//!
//! let forum = FakeForum::new(vec![(1, vec!["a"]), (2, vec![])]);
//! let indexer = RecordingIndexer::new();
//! ```

mod fakes;
mod log_capture;
mod tasks;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use fakes::{FakeForum, RecordingIndexer};
#[allow(unused_imports)]
pub use log_capture::{CapturedEvent, LogCapture};
#[allow(unused_imports)]
pub use tasks::{AlwaysFailingTask, CountingTask, SlowTask};

use forum_tasks::{TaskRegistry, TaskState};
use std::time::Duration;

/// Poll until the task reaches `expected` or the attempts run out.
#[allow(dead_code)]
pub async fn wait_for_state(registry: &TaskRegistry, name: &str, expected: TaskState) -> bool {
    for _ in 0..100 {
        if registry.task_state(name).await == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
