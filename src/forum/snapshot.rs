use super::models::{BoardId, Message};
use super::repository::{BoardRepository, MessageRepository};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A board and its messages, as stored in a snapshot file.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardSnapshot {
    pub id: BoardId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Point-in-time export of a forum's boards and messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumSnapshot {
    #[serde(default)]
    pub boards: Vec<BoardSnapshot>,
}

impl ForumSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read forum snapshot: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse forum snapshot: {:?}", path))
    }
}

/// Read-only forum backed by a snapshot held in memory.
///
/// Boards are listed in snapshot order.
pub struct InMemoryForum {
    board_ids: Vec<BoardId>,
    messages: HashMap<BoardId, Vec<Message>>,
}

impl InMemoryForum {
    pub fn from_snapshot(snapshot: ForumSnapshot) -> Result<Self> {
        let mut board_ids = Vec::with_capacity(snapshot.boards.len());
        let mut messages = HashMap::with_capacity(snapshot.boards.len());

        for board in snapshot.boards {
            if messages.contains_key(&board.id) {
                bail!("Duplicate board id in snapshot: {}", board.id);
            }
            if let Some(stray) = board.messages.iter().find(|m| m.board_id != board.id) {
                bail!(
                    "Message {} belongs to board {} but is listed under board {}",
                    stray.id,
                    stray.board_id,
                    board.id
                );
            }
            board_ids.push(board.id);
            messages.insert(board.id, board.messages);
        }

        Ok(Self {
            board_ids,
            messages,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_snapshot(ForumSnapshot::load(path)?)
    }

    pub fn board_count(&self) -> usize {
        self.board_ids.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl BoardRepository for InMemoryForum {
    async fn list_boards(&self) -> Result<Vec<BoardId>> {
        Ok(self.board_ids.clone())
    }
}

#[async_trait]
impl MessageRepository for InMemoryForum {
    async fn messages_by_board(&self, board_id: BoardId) -> Result<Vec<Message>> {
        Ok(self.messages.get(&board_id).cloned().unwrap_or_default())
    }
}
