use crate::forum::Message;
use anyhow::Result;
use async_trait::async_trait;

/// Downstream search index fed by the rebuild task.
///
/// Implementations are shared between tasks and must handle their own
/// synchronization.
#[async_trait]
pub trait SearchIndexer: Send + Sync {
    /// Add or update messages in the index.
    ///
    /// If a message with the same id is already indexed, it is replaced.
    async fn add_or_update(&self, messages: &[Message]) -> Result<()>;
}
