use anyhow::{bail, Result};
use async_trait::async_trait;
use forum_tasks::{BoardId, BoardRepository, Message, MessageRepository, SearchIndexer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Boards and messages held in memory, with injectable failures.
pub struct FakeForum {
    boards: Vec<(BoardId, Vec<Message>)>,
    /// Boards whose next message fetch fails; each entry fails once.
    failing_once: Mutex<HashSet<BoardId>>,
    fail_board_listing: Mutex<bool>,
    board_list_calls: AtomicUsize,
    message_calls: AtomicUsize,
}

impl FakeForum {
    /// Build from `(board id, message texts)` pairs, in board order.
    pub fn new(boards: Vec<(i64, Vec<&str>)>) -> Self {
        let mut next_id = 0;
        let boards = boards
            .into_iter()
            .map(|(board, texts)| {
                let board_id = BoardId(board);
                let messages = texts
                    .into_iter()
                    .map(|text| {
                        next_id += 1;
                        Message::new(next_id, board_id, text)
                    })
                    .collect();
                (board_id, messages)
            })
            .collect();

        Self {
            boards,
            failing_once: Mutex::new(HashSet::new()),
            fail_board_listing: Mutex::new(false),
            board_list_calls: AtomicUsize::new(0),
            message_calls: AtomicUsize::new(0),
        }
    }

    /// Make the next message fetch for `board` fail.
    pub fn fail_once_on_board(&self, board: i64) {
        self.failing_once.lock().unwrap().insert(BoardId(board));
    }

    #[allow(dead_code)]
    pub fn set_fail_board_listing(&self, fail: bool) {
        *self.fail_board_listing.lock().unwrap() = fail;
    }

    #[allow(dead_code)]
    pub fn board_list_calls(&self) -> usize {
        self.board_list_calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BoardRepository for FakeForum {
    async fn list_boards(&self) -> Result<Vec<BoardId>> {
        self.board_list_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_board_listing.lock().unwrap() {
            bail!("board listing unavailable");
        }
        Ok(self.boards.iter().map(|(id, _)| *id).collect())
    }
}

#[async_trait]
impl MessageRepository for FakeForum {
    async fn messages_by_board(&self, board_id: BoardId) -> Result<Vec<Message>> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_once.lock().unwrap().remove(&board_id) {
            bail!("database timeout on board {}", board_id);
        }
        Ok(self
            .boards
            .iter()
            .find(|(id, _)| *id == board_id)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default())
    }
}

/// Indexer recording the texts of every batch it receives.
pub struct RecordingIndexer {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingIndexer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `add_or_update` call so far, as message texts.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchIndexer for RecordingIndexer {
    async fn add_or_update(&self, messages: &[Message]) -> Result<()> {
        let texts = messages.iter().map(|m| m.text.clone()).collect();
        self.calls.lock().unwrap().push(texts);
        Ok(())
    }
}
