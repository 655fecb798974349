use super::indexer::SearchIndexer;
use crate::forum::{BoardId, Message};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use unicode_segmentation::UnicodeSegmentation;

/// A message matching a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub message_id: i64,
    pub board_id: BoardId,
    /// Number of distinct query terms found in the message.
    pub score: usize,
}

struct IndexedMessage {
    board_id: BoardId,
    terms: HashSet<String>,
}

#[derive(Default)]
struct IndexState {
    messages: HashMap<i64, IndexedMessage>,
    postings: HashMap<String, HashSet<i64>>,
}

impl IndexState {
    fn remove(&mut self, message_id: i64) {
        let Some(old) = self.messages.remove(&message_id) else {
            return;
        };
        for term in old.terms {
            if let Some(ids) = self.postings.get_mut(&term) {
                ids.remove(&message_id);
                if ids.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    fn upsert(&mut self, message: &Message) {
        self.remove(message.id);
        let terms = tokenize(&message.indexable_text());
        for term in &terms {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(message.id);
        }
        self.messages.insert(
            message.id,
            IndexedMessage {
                board_id: message.board_id,
                terms,
            },
        );
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .unicode_words()
        .map(|w| w.to_string())
        .collect()
}

/// In-process inverted index over message terms.
#[derive(Default)]
pub struct MemorySearchIndex {
    state: Mutex<IndexState>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed messages.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.messages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages containing any of the query's terms, best matches first.
    pub fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Search index lock poisoned"))?;

        let mut scores: HashMap<i64, usize> = HashMap::new();
        for term in tokenize(query) {
            if let Some(ids) = state.postings.get(&term) {
                for id in ids {
                    *scores.entry(*id).or_insert(0) += 1;
                }
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .filter_map(|(message_id, score)| {
                state.messages.get(&message_id).map(|m| SearchHit {
                    message_id,
                    board_id: m.board_id,
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.message_id.cmp(&b.message_id)));
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[async_trait]
impl SearchIndexer for MemorySearchIndex {
    async fn add_or_update(&self, messages: &[Message]) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Search index lock poisoned"))?;
        for message in messages {
            state.upsert(message);
        }
        Ok(())
    }
}
