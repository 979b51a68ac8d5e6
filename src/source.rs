//! Making the local content tree available before a rebuild.
//!
//! A [`ContentSourceGate`] owns the local checkout. With `reset_on_rebuild`
//! enabled it throws the checkout away and fetches a fresh copy through a
//! [`VersionedSource`] on every rebuild; otherwise it trusts whatever is
//! already on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::config::SourceConfig;
use crate::error::SourceError;

/// A remote, versioned copy of the content tree.
#[async_trait]
pub trait VersionedSource: Send + Sync {
    /// Human-readable location, for logs.
    fn location(&self) -> &str;

    /// Fetch a complete copy into `dest`, which does not exist yet.
    async fn fetch(&self, dest: &Path) -> Result<(), SourceError>;
}

/// Clones a Git repository with the `git` executable.
#[derive(Debug, Clone)]
pub struct GitSource {
    url: String,
    branch: Option<String>,
    shallow: bool,
}

impl GitSource {
    pub fn new(url: impl Into<String>, branch: Option<String>, shallow: bool) -> Self {
        Self {
            url: url.into(),
            branch,
            shallow,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.url.clone(), config.branch.clone(), config.shallow)
    }
}

#[async_trait]
impl VersionedSource for GitSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, dest: &Path) -> Result<(), SourceError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut cmd = Command::new("git");
        cmd.arg("clone");
        if let Some(branch) = &self.branch {
            cmd.args(["--branch", branch, "--single-branch"]);
        }
        if self.shallow {
            cmd.args(["--depth", "1"]);
        }
        cmd.arg(&self.url).arg(dest);

        let output = cmd.output().await.map_err(|e| {
            SourceError::SourceUnavailable(format!(
                "failed to execute 'git clone' (is git installed?): {}",
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::SourceUnavailable(format!(
                "git clone of {} failed: {}",
                self.url,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

pub struct ContentSourceGate {
    root: PathBuf,
    reset_on_rebuild: bool,
    source: Option<Arc<dyn VersionedSource>>,
}

impl ContentSourceGate {
    pub fn new(
        root: impl Into<PathBuf>,
        reset_on_rebuild: bool,
        source: Option<Arc<dyn VersionedSource>>,
    ) -> Self {
        Self {
            root: root.into(),
            reset_on_rebuild,
            source,
        }
    }

    /// A gate over an existing local tree that never fetches.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(root, false, None)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the local tree is ready to be indexed.
    ///
    /// Without `reset_on_rebuild` this is a no-op. With it, the existing
    /// checkout is deleted, a fresh copy is fetched, and the result must be a
    /// non-empty directory.
    pub async fn ensure_ready(&self) -> Result<(), SourceError> {
        tracing::info!(
            root = %self.root.display(),
            reset = self.reset_on_rebuild,
            "preparing content source"
        );
        if !self.reset_on_rebuild {
            return Ok(());
        }

        let source = self.source.as_ref().ok_or_else(|| {
            SourceError::SourceUnavailable("reset requested but no source is configured".into())
        })?;

        if self.root.is_dir() {
            tracing::info!(root = %self.root.display(), "deleting existing checkout");
            tokio::fs::remove_dir_all(&self.root).await?;
        }

        tracing::info!(location = source.location(), "fetching content");
        source.fetch(&self.root).await?;

        if !is_populated(&self.root) {
            return Err(SourceError::EmptyContent(self.root.clone()));
        }
        Ok(())
    }
}

/// True when `dir` exists and has at least one entry.
pub fn is_populated(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes a fixed set of files, or nothing at all.
    struct FakeSource {
        files: Vec<(&'static str, &'static str)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VersionedSource for FakeSource {
        fn location(&self) -> &str {
            "fake://content"
        }

        async fn fetch(&self, dest: &Path) -> Result<(), SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::create_dir_all(dest)?;
            for (name, body) in &self.files {
                fs::write(dest.join(name), body)?;
            }
            Ok(())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl VersionedSource for BrokenSource {
        fn location(&self) -> &str {
            "broken://"
        }

        async fn fetch(&self, _dest: &Path) -> Result<(), SourceError> {
            Err(SourceError::SourceUnavailable("remote hung up".into()))
        }
    }

    #[test]
    fn test_is_populated() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_populated(tmp.path()));
        assert!(!is_populated(&tmp.path().join("missing")));
        fs::write(tmp.path().join("x"), "x").unwrap();
        assert!(is_populated(tmp.path()));
    }

    #[tokio::test]
    async fn test_no_reset_never_fetches() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.md"), "keep").unwrap();
        let source = Arc::new(FakeSource {
            files: vec![("new.md", "new")],
            calls: AtomicUsize::new(0),
        });
        let gate = ContentSourceGate::new(tmp.path(), false, Some(source.clone()));

        gate.ensure_ready().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(tmp.path().join("keep.md").exists());
        assert!(!tmp.path().join("new.md").exists());
    }

    #[tokio::test]
    async fn test_reset_replaces_checkout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("site");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("stale.md"), "stale").unwrap();
        let source = Arc::new(FakeSource {
            files: vec![("fresh.md", "fresh")],
            calls: AtomicUsize::new(0),
        });
        let gate = ContentSourceGate::new(&root, true, Some(source.clone()));

        gate.ensure_ready().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(!root.join("stale.md").exists());
        assert!(root.join("fresh.md").exists());
    }

    #[tokio::test]
    async fn test_reset_with_empty_fetch_is_empty_content() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("site");
        let source = Arc::new(FakeSource {
            files: vec![],
            calls: AtomicUsize::new(0),
        });
        let gate = ContentSourceGate::new(&root, true, Some(source));

        let err = gate.ensure_ready().await.unwrap_err();
        assert!(matches!(err, SourceError::EmptyContent(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_source_unavailable() {
        let tmp = TempDir::new().unwrap();
        let gate = ContentSourceGate::new(tmp.path().join("site"), true, Some(Arc::new(BrokenSource)));

        let err = gate.ensure_ready().await.unwrap_err();
        assert!(matches!(err, SourceError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_reset_without_source_fails() {
        let tmp = TempDir::new().unwrap();
        let gate = ContentSourceGate::new(tmp.path(), true, None);
        let err = gate.ensure_ready().await.unwrap_err();
        assert!(matches!(err, SourceError::SourceUnavailable(_)));
    }
}
