//! Identity keys for engine upserts.
//!
//! A key is the alphabetic characters of an item's title, in order and with
//! case preserved, followed by its publication date rendered with a fixed
//! pattern. Items that agree on both collide to the same key, so a rebuild
//! replaces the engine's prior copy of "the same" item instead of adding a
//! second one.

use crate::models::ContentItem;

#[derive(Debug, Clone)]
pub struct IdentityHasher {
    date_format: String,
}

impl IdentityHasher {
    /// `date_format` is a chrono strftime pattern, e.g. `%Y-%m-%d`.
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    pub fn hash(&self, item: &ContentItem) -> String {
        let mut key: String = item.title.chars().filter(|c| c.is_alphabetic()).collect();
        key.push_str(&item.date.format(&self.date_format).to_string());
        key
    }
}
