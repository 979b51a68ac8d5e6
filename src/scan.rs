//! Discovery of eligible content files.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ContentConfig;
use crate::error::RebuildError;

/// File selection and path canonicalization rules for one content tree.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    extensions: Vec<String>,
    source_extension: String,
    served_extension: String,
    excludes: GlobSet,
    follow_symlinks: bool,
}

impl ContentFilter {
    pub fn new(
        extensions: &[String],
        source_extension: &str,
        served_extension: &str,
        exclude_globs: &[String],
        follow_symlinks: bool,
    ) -> anyhow::Result<Self> {
        let mut patterns = vec!["**/.git/**".to_string()];
        patterns.extend(exclude_globs.iter().cloned());

        Ok(Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            source_extension: source_extension.to_lowercase(),
            served_extension: served_extension.to_string(),
            excludes: build_globset(&patterns)?,
            follow_symlinks,
        })
    }

    pub fn from_config(config: &ContentConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.extensions,
            &config.source_extension,
            &config.served_extension,
            &config.exclude_globs,
            config.follow_symlinks,
        )
    }

    /// A file is eligible when its lowercase name contains any configured
    /// extension token.
    pub fn is_eligible(&self, file: &Path) -> bool {
        let Some(name) = file.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.extensions.iter().any(|ext| name.contains(ext.as_str()))
    }

    /// Served path for `file` under `content_dir`: root prefix stripped,
    /// `/`-separated with a leading `/`, lowercased, and the source
    /// extension rewritten to the served one.
    pub fn canonical_path(&self, file: &Path, content_dir: &Path) -> String {
        let relative = file.strip_prefix(content_dir).unwrap_or(file);
        let mut path = String::new();
        for component in relative.components() {
            path.push('/');
            path.push_str(&component.as_os_str().to_string_lossy());
        }
        let mut path = path.to_lowercase();

        if !self.source_extension.is_empty() && path.ends_with(&self.source_extension) {
            path.truncate(path.len() - self.source_extension.len());
            path.push_str(&self.served_extension);
        }
        path
    }

    /// Walk `content_dir` and return every eligible regular file exactly once,
    /// in path order.
    pub fn discover(&self, content_dir: &Path) -> Result<BTreeSet<PathBuf>, RebuildError> {
        let mut files = BTreeSet::new();

        for entry in WalkDir::new(content_dir).follow_links(self.follow_symlinks) {
            let entry = entry.map_err(|e| RebuildError::Walk(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(content_dir).unwrap_or(path);
            if self.excludes.is_match(relative) {
                continue;
            }
            if !self.is_eligible(path) {
                tracing::debug!(file = %path.display(), "skipping ineligible file");
                continue;
            }
            files.insert(path.to_path_buf());
        }

        Ok(files)
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
