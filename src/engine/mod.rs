//! Full-text engine abstraction.
//!
//! The [`SearchEngine`] trait is the only surface the rebuild and query
//! pipeline needs from the engine: keyed upserts and top-N queries returning
//! stored paths in relevance order.
//!
//! | Backend | Notes |
//! |---------|-------|
//! | [`SqliteEngine`] | SQLite FTS5, persistent, BM25 ranking |
//! | [`MemoryEngine`] | In-process term matching for tests and embedding |
//!
//! Both backends apply a batch transactionally: if any document in a batch
//! fails, none of the batch is visible afterwards.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::SearchDocument;

pub use memory::MemoryEngine;
pub use sqlite::SqliteEngine;

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Upsert every document: delete whatever carries the same key or the
    /// same path, then insert. Documents are applied in slice order, so when
    /// two share a key the later one is kept. Returns the number of
    /// documents written.
    async fn write_batch(&self, docs: &[SearchDocument]) -> Result<usize, EngineError>;

    /// Run a plain text query and return up to `limit` stored paths, best
    /// first. Every whitespace-separated term must match; punctuation inside
    /// a term is not query syntax.
    async fn query(&self, query: &str, limit: usize) -> Result<Vec<String>, EngineError>;

    /// Number of documents currently stored.
    async fn count(&self) -> Result<usize, EngineError>;
}
