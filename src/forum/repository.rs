use super::models::{BoardId, Message};
use anyhow::Result;
use async_trait::async_trait;

/// Read access to the forum's boards.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// All board ids, in the order tasks should process them.
    async fn list_boards(&self) -> Result<Vec<BoardId>>;
}

/// Read access to the forum's messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Every message posted on the given board.
    async fn messages_by_board(&self, board_id: BoardId) -> Result<Vec<Message>>;
}
