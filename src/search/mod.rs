//! Search indexing collaborators.

mod indexer;
mod memory_index;

pub use indexer::SearchIndexer;
pub use memory_index::{MemorySearchIndex, SearchHit};
