//! Projection of content items into engine documents, and the keyed upsert.

use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::engine::SearchEngine;
use crate::error::EngineError;
use crate::identity::IdentityHasher;
use crate::models::{ContentItem, SearchDocument};

pub struct IndexWriter {
    hasher: IdentityHasher,
    engine: Arc<dyn SearchEngine>,
}

impl IndexWriter {
    pub fn new(hasher: IdentityHasher, engine: Arc<dyn SearchEngine>) -> Self {
        Self { hasher, engine }
    }

    pub fn hasher(&self) -> &IdentityHasher {
        &self.hasher
    }

    pub fn to_search_document(&self, item: &ContentItem) -> SearchDocument {
        SearchDocument {
            key: self.hasher.hash(item),
            path: item.path.clone(),
            title: item.title.clone(),
            original_content: item.original_content.clone(),
            content: html_to_text(&item.processed_content),
            time: item.date.timestamp_millis(),
        }
    }

    /// Upsert every item as one batch, in path order.
    ///
    /// When two items share an identity key, the one whose path sorts last
    /// is the one the engine keeps. The batch is all-or-nothing: on error the
    /// engine holds exactly what it held before the call.
    pub async fn write_all<'a, I>(&self, items: I) -> Result<usize, EngineError>
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        let mut docs: Vec<SearchDocument> = items
            .into_iter()
            .map(|item| self.to_search_document(item))
            .collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        self.engine.write_batch(&docs).await
    }
}

fn strip_patterns() -> &'static (Regex, Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap(),
            Regex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap(),
            Regex::new(r"\s+").unwrap(),
        )
    })
}

/// Plain text of an HTML fragment: tags, comments and script/style bodies
/// removed, common entities decoded, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let (blocks, tags, spaces) = strip_patterns();
    let text = blocks.replace_all(html, " ");
    let text = tags.replace_all(&text, " ");
    let text = decode_entities(&text);
    spaces.replace_all(text.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
