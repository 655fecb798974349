//! Specific background task implementations.
//!
//! This module contains implementations of the `BackgroundTask` trait
//! for forum maintenance work.

pub mod search_index_rebuild;

pub use search_index_rebuild::SearchIndexRebuildTask;
