//! Forum background task engine
//!
//! This library exposes the task engine and its collaborators for the host
//! binary, for tests and for embedding in a forum application.

pub mod background_tasks;
pub mod config;
pub mod forum;
pub mod metrics;
pub mod search;

// Re-export commonly used types for convenience
pub use background_tasks::{
    BackgroundTask, Criticality, RegistryError, TaskContext, TaskError, TaskRegistry,
    TaskSchedule, TaskState,
};
pub use forum::{BoardId, BoardRepository, InMemoryForum, Message, MessageRepository};
pub use search::{MemorySearchIndex, SearchIndexer};
