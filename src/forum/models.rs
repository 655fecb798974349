use serde::{Deserialize, Serialize};

/// Identifier of a forum board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub i64);

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A forum message as seen by the search indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub board_id: BoardId,
    #[serde(default)]
    pub topic_id: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub text: String,
    /// Unix timestamp of when the message was posted.
    #[serde(default)]
    pub posted: i64,
}

impl Message {
    /// Create a message with only the fields the indexer requires.
    pub fn new(id: i64, board_id: BoardId, text: impl Into<String>) -> Self {
        Self {
            id,
            board_id,
            topic_id: 0,
            author: String::new(),
            subject: None,
            text: text.into(),
            posted: 0,
        }
    }

    /// Text fed to the search index: subject followed by body.
    pub fn indexable_text(&self) -> String {
        match &self.subject {
            Some(subject) if !subject.is_empty() => format!("{} {}", subject, self.text),
            _ => self.text.clone(),
        }
    }
}
