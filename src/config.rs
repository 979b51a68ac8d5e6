use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub content: ContentConfig,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_subdirectory")]
    pub subdirectory: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    #[serde(default = "default_served_extension")]
    pub served_extension: String,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_subdirectory() -> String {
    "content".to_string()
}
fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "html".to_string()]
}
fn default_source_extension() -> String {
    ".md".to_string()
}
fn default_served_extension() -> String {
    ".html".to_string()
}
fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_shallow")]
    pub shallow: bool,
    #[serde(default)]
    pub reset_on_rebuild: bool,
}

fn default_shallow() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// strftime pattern appended to the title letters in identity keys.
    #[serde(default = "default_date_format")]
    pub key_date_format: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            key_date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

impl Config {
    /// Local checkout of the content tree.
    ///
    /// Falls back to a cache directory next to the database, keyed by the
    /// source URL, when no explicit root is configured.
    pub fn content_root(&self) -> PathBuf {
        if let Some(root) = &self.content.root {
            return root.clone();
        }
        let db_parent = self.db.path.parent().unwrap_or_else(|| Path::new("."));
        let url = self.source.as_ref().map(|s| s.url.as_str()).unwrap_or("");
        db_parent.join(".content-cache").join(short_hash(url))
    }

    /// The directory that is actually walked during a rebuild.
    pub fn content_dir(&self) -> PathBuf {
        let root = self.content_root();
        if self.content.subdirectory.is_empty() || self.content.subdirectory == "." {
            root
        } else {
            root.join(&self.content.subdirectory)
        }
    }

    pub fn reset_on_rebuild(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.reset_on_rebuild)
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(12);
    for byte in &digest[..6] {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.content.extensions.is_empty() {
        anyhow::bail!("content.extensions must list at least one extension");
    }
    if config
        .content
        .extensions
        .iter()
        .any(|e| e.trim().is_empty())
    {
        anyhow::bail!("content.extensions must not contain empty entries");
    }

    if config.search.default_page_size == 0 {
        anyhow::bail!("search.default_page_size must be > 0");
    }

    match &config.source {
        Some(source) if source.url.trim().is_empty() => {
            anyhow::bail!("source.url must not be empty");
        }
        None if config.content.root.is_none() => {
            anyhow::bail!("content.root is required when no [source] is configured");
        }
        _ => {}
    }

    check_date_format("content.date_format", &config.content.date_format)?;
    check_date_format("index.key_date_format", &config.index.key_date_format)?;

    Ok(())
}

fn check_date_format(field: &str, pattern: &str) -> Result<()> {
    use chrono::format::{Item, StrftimeItems};

    if pattern.is_empty() {
        anyhow::bail!("{} must not be empty", field);
    }
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        anyhow::bail!("{} is not a valid date pattern: '{}'", field, pattern);
    }
    Ok(())
}
