//! Core data models used throughout the indexer.
//!
//! These types represent the content items, snapshots, and search pages that
//! flow through the rebuild and query pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One servable unit of content, built from a single file.
///
/// Items are immutable once built. A rebuild produces fresh items and
/// supersedes the previous ones wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    /// Canonical served path: lowercase, `/`-separated, leading `/`.
    pub path: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub listed: bool,
    pub original_content: String,
    pub processed_content: String,
}

/// Point-in-time mapping from served path to content item.
///
/// Exactly one snapshot is live at a time. Rebuilds construct a new one off
/// to the side and swap it in whole.
#[derive(Debug, Clone, Default)]
pub struct Index {
    items: HashMap<String, Arc<ContentItem>>,
}

impl Index {
    pub fn new(items: HashMap<String, Arc<ContentItem>>) -> Self {
        Self { items }
    }

    pub fn get(&self, path: &str) -> Option<&Arc<ContentItem>> {
        self.items.get(path)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<ContentItem>> {
        self.items.values()
    }
}

/// The full-text engine's projection of a [`ContentItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDocument {
    /// Identity hash; the upsert key.
    pub key: String,
    pub path: String,
    pub title: String,
    pub original_content: String,
    /// Plain text extracted from the processed form.
    pub content: String,
    /// Publication time in epoch milliseconds.
    pub time: i64,
}

/// One page of query results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultsPage {
    /// Matches after visibility filtering, before slicing.
    pub total: usize,
    pub offset: usize,
    pub page_size: usize,
    pub items: Vec<Arc<ContentItem>>,
}

/// Outcome of a successful rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildStatus {
    pub count: usize,
    pub completed_at: DateTime<Utc>,
}
