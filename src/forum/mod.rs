//! Forum data consumed by background tasks.
//!
//! The forum application owns boards and messages; the task engine only
//! reads them through the repository traits defined here.

mod models;
mod repository;
mod snapshot;

pub use models::{BoardId, Message};
pub use repository::{BoardRepository, MessageRepository};
pub use snapshot::{BoardSnapshot, ForumSnapshot, InMemoryForum};
