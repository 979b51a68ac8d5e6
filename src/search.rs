//! Paginated full-text search over the live snapshot.
//!
//! The engine supplies matching paths in relevance order. Each path is
//! resolved against the snapshot taken at the start of the call, so a
//! rebuild finishing mid-query cannot mix two generations. Paths the
//! snapshot does not know (engine documents left over from content that
//! has since been removed) are skipped silently.
//!
//! Final ordering is by publication date, newest first; relevance only
//! decides membership.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::SearchError;
use crate::models::{ContentItem, SearchResultsPage};
use crate::service::IndexService;

impl IndexService {
    /// Run `query` and return the `[offset, offset + page_size)` slice of the
    /// date-sorted results.
    ///
    /// `query` is plain text: every whitespace-separated term must match and
    /// punctuation inside a term (`spring-boot`, `c++`) is searched, not
    /// parsed. With `listed_only` set, unlisted items are removed before
    /// counting and slicing; without it they are included.
    pub async fn search(
        &self,
        query: &str,
        offset: usize,
        page_size: usize,
        listed_only: bool,
    ) -> Result<SearchResultsPage, SearchError> {
        if page_size == 0 {
            return Err(SearchError::InvalidPageSize);
        }

        let snapshot = self.snapshot();
        if query.trim().is_empty() || snapshot.is_empty() {
            return Ok(SearchResultsPage {
                total: 0,
                offset,
                page_size,
                items: Vec::new(),
            });
        }

        // Engine documents the snapshot no longer knows still take result
        // slots, so ask for everything the engine holds.
        let limit = self.engine.count().await?.max(snapshot.len());
        let paths = self.engine.query(query, limit).await?;

        let mut seen = HashSet::new();
        let mut results: Vec<Arc<ContentItem>> = paths
            .iter()
            .filter(|path| seen.insert(*path))
            .filter_map(|path| snapshot.get(path).cloned())
            .collect();
        results.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));
        if listed_only {
            results.retain(|item| item.listed);
        }

        let total = results.len();
        let items = paginate(&results, offset, page_size).to_vec();

        tracing::info!(
            query,
            offset,
            page_size,
            listed_only,
            total,
            returned = items.len(),
            "search"
        );

        Ok(SearchResultsPage {
            total,
            offset,
            page_size,
            items,
        })
    }
}

/// `[offset, offset + page_size)` clamped to the slice; empty past the end.
fn paginate<T>(items: &[T], offset: usize, page_size: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = offset.saturating_add(page_size).min(items.len());
    &items[start..end]
}
