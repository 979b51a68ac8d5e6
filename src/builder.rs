//! Turning one content file into a [`ContentItem`].
//!
//! The rebuild pipeline only depends on the [`DocumentBuilder`] trait.
//! [`FrontMatterBuilder`] is the built-in implementation: it reads a header of
//! `key=value` lines closed by a line of tildes, followed by the body.
//!
//! ```text
//! title=Hello, World!
//! date=2021-06-01
//! status=published
//! listed=true
//! ~~~~~~
//! <p>The body.</p>
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;

use crate::error::BuildError;
use crate::models::ContentItem;

/// Builds a content item from a file on disk.
///
/// Called from blocking worker threads, one call per eligible file, so
/// implementations must be `Send + Sync` and may do synchronous IO.
pub trait DocumentBuilder: Send + Sync {
    /// `path` is the canonical served path the item must carry.
    fn build(&self, path: &str, file: &Path) -> Result<ContentItem, BuildError>;
}

/// Header-and-body builder for JBake-style content files.
#[derive(Debug, Clone)]
pub struct FrontMatterBuilder {
    date_format: String,
}

impl FrontMatterBuilder {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    fn parse_date(&self, value: &str) -> Result<DateTime<Utc>, BuildError> {
        let invalid = |reason: String| BuildError::InvalidDate {
            value: value.to_string(),
            reason,
        };

        if let Ok(dt) = NaiveDateTime::parse_from_str(value, &self.date_format) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        let date = NaiveDate::parse_from_str(value, &self.date_format)
            .map_err(|e| invalid(e.to_string()))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid("out of range".to_string()))?;
        Ok(Utc.from_utc_datetime(&midnight))
    }
}

impl Default for FrontMatterBuilder {
    fn default() -> Self {
        Self::new("%Y-%m-%d")
    }
}

impl DocumentBuilder for FrontMatterBuilder {
    fn build(&self, path: &str, file: &Path) -> Result<ContentItem, BuildError> {
        let raw = std::fs::read_to_string(file)?;
        let (header, body) = split_front_matter(&raw);

        let title = header
            .get("title")
            .filter(|t| !t.is_empty())
            .ok_or(BuildError::MissingField("title"))?
            .clone();
        let date = header
            .get("date")
            .filter(|d| !d.is_empty())
            .ok_or(BuildError::MissingField("date"))?;
        let date = self.parse_date(date)?;

        let draft = header
            .get("status")
            .is_some_and(|s| s.eq_ignore_ascii_case("draft"));
        let listed = match header.get("listed") {
            Some(v) => !v.eq_ignore_ascii_case("false"),
            None => true,
        };

        Ok(ContentItem {
            path: path.to_string(),
            title,
            date,
            listed: listed && !draft,
            original_content: body.to_string(),
            processed_content: body.to_string(),
        })
    }
}

/// Split a file into its header map and body.
///
/// Files without a tilde separator are treated as body-only.
fn split_front_matter(raw: &str) -> (HashMap<String, String>, &str) {
    let mut header = HashMap::new();
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim();
        offset += line.len();

        if !trimmed.is_empty() && trimmed.chars().all(|c| c == '~') {
            return (header, &raw[offset..]);
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            header.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    (HashMap::new(), raw)
}
