//! In-memory [`SearchEngine`] for tests and embedding.
//!
//! Documents live in a `HashMap` keyed by identity hash behind a
//! `std::sync::RwLock`. A query matches a document when every query term
//! appears among its terms; matches are ranked by total term frequency.
//! Batches are staged on a copy and published in one step. A path holds at
//! most one document, whatever its key.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::SearchEngine;
use crate::error::EngineError;
use crate::models::SearchDocument;

#[derive(Clone)]
struct StoredDoc {
    doc: SearchDocument,
    terms: HashMap<String, usize>,
}

#[derive(Default)]
pub struct MemoryEngine {
    docs: RwLock<HashMap<String, StoredDoc>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored document for a key, if any.
    pub fn get(&self, key: &str) -> Option<SearchDocument> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        docs.get(key).map(|d| d.doc.clone())
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = docs.keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn term_counts(doc: &SearchDocument) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for field in [&doc.title, &doc.path, &doc.original_content, &doc.content] {
        for term in tokenize(field) {
            *counts.entry(term).or_insert(0) += 1;
        }
    }
    counts
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn write_batch(&self, docs: &[SearchDocument]) -> Result<usize, EngineError> {
        let mut guard = self.docs.write().unwrap_or_else(|e| e.into_inner());
        let mut staged = guard.clone();
        for doc in docs {
            staged.remove(&doc.key);
            staged.retain(|_, stored| stored.doc.path != doc.path);
            staged.insert(
                doc.key.clone(),
                StoredDoc {
                    doc: doc.clone(),
                    terms: term_counts(doc),
                },
            );
        }
        *guard = staged;
        Ok(docs.len())
    }

    async fn query(&self, query: &str, limit: usize) -> Result<Vec<String>, EngineError> {
        let terms: Vec<String> = tokenize(query).collect();
        if terms.is_empty() {
            return Err(EngineError::Query(format!(
                "query '{}' contains no searchable terms",
                query
            )));
        }

        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<(usize, &str)> = docs
            .values()
            .filter_map(|stored| {
                let mut score = 0;
                for term in &terms {
                    score += *stored.terms.get(term)?;
                }
                Some((score, stored.doc.path.as_str()))
            })
            .collect();

        hits.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(b.1)));
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(_, path)| path.to_string())
            .collect())
    }

    async fn count(&self) -> Result<usize, EngineError> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        Ok(docs.len())
    }
}
