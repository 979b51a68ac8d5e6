//! Index rebuild orchestration.
//!
//! A rebuild runs these steps in order:
//!
//! 1. publish [`IndexEvent::Started`]
//! 2. prepare the content tree through the source gate
//! 3. walk the content directory and collect eligible files
//! 4. build every file on its own blocking task and wait for all of them
//! 5. upsert the resulting documents into the engine as one batch, in path
//!    order
//! 6. swap the new snapshot in and publish [`IndexEvent::Finished`]
//!
//! Any failure stops the rebuild before step 6, so the previous snapshot
//! keeps serving. A failed engine batch is rolled back as a whole.

use chrono::Utc;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use crate::error::{BuildError, RebuildError};
use crate::events::IndexEvent;
use crate::models::{ContentItem, Index, RebuildStatus};
use crate::service::IndexService;
use crate::source::is_populated;

/// Result of one build task: file ordinal, served path, outcome.
type BuildOutcome = (usize, String, Result<ContentItem, BuildError>);

impl IndexService {
    /// Rebuild the index from the content tree and make it live.
    ///
    /// Concurrent callers queue behind the rebuild in flight.
    pub async fn rebuild(&self) -> Result<RebuildStatus, RebuildError> {
        let _guard = self.rebuild_lock.lock().await;
        let timer = Instant::now();

        self.events.publish(IndexEvent::Started { at: Utc::now() });

        self.gate.ensure_ready().await?;

        let root = self.gate.root();
        if !is_populated(root) {
            return Err(RebuildError::NoContent(root.to_path_buf()));
        }
        if !self.content_dir.is_dir() {
            return Err(RebuildError::NoContent(self.content_dir.clone()));
        }

        let files = {
            let filter = self.filter.clone();
            let dir = self.content_dir.clone();
            tokio::task::spawn_blocking(move || filter.discover(&dir)).await??
        };
        tracing::debug!(files = files.len(), "discovered eligible files");

        let items = self.build_all(files).await?;
        if items.is_empty() {
            return Err(RebuildError::EmptyResult);
        }

        let written = self
            .writer
            .write_all(items.values().map(Arc::as_ref))
            .await
            .map_err(RebuildError::IndexWriteFailure)?;
        tracing::debug!(documents = written, "engine batch committed");

        let index = Arc::new(Index::new(items));
        self.current.store(Arc::clone(&index));

        let completed_at = Utc::now();
        let count = index.len();
        tracing::info!(
            items = count,
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "index rebuilt"
        );
        self.events.publish(IndexEvent::Finished {
            index,
            at: completed_at,
        });

        Ok(RebuildStatus {
            count,
            completed_at,
        })
    }

    /// Build one item per file, each on its own blocking task.
    ///
    /// Every task is awaited before returning, even after a failure. When
    /// several files fail, the one earliest in path order is reported. When
    /// two files map to the same served path, the later file in path order
    /// wins.
    async fn build_all(
        &self,
        files: BTreeSet<PathBuf>,
    ) -> Result<HashMap<String, Arc<ContentItem>>, RebuildError> {
        let mut tasks: JoinSet<BuildOutcome> = JoinSet::new();

        for (ordinal, file) in files.into_iter().enumerate() {
            let path = self.filter.canonical_path(&file, &self.content_dir);
            let builder = Arc::clone(&self.builder);
            tasks.spawn_blocking(move || {
                tracing::debug!(path = %path, file = %file.display(), "building content item");
                let result = panic::catch_unwind(AssertUnwindSafe(|| builder.build(&path, &file)))
                    .unwrap_or_else(|payload| Err(BuildError::Panicked(panic_message(payload))));
                (ordinal, path, result)
            });
        }

        let mut accumulated: HashMap<String, (usize, Arc<ContentItem>)> = HashMap::new();
        let mut failure: Option<(usize, RebuildError)> = None;

        while let Some(joined) = tasks.join_next().await {
            let (ordinal, path, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    if failure.is_none() {
                        failure = Some((usize::MAX, RebuildError::Join(e)));
                    }
                    continue;
                }
            };

            match result {
                Ok(item) => {
                    let key = item.path.clone();
                    match accumulated.get(&key) {
                        Some((existing, _)) if *existing > ordinal => {
                            tracing::warn!(path = %key, "duplicate served path; keeping later file");
                        }
                        Some(_) => {
                            tracing::warn!(path = %key, "duplicate served path; keeping later file");
                            accumulated.insert(key, (ordinal, Arc::new(item)));
                        }
                        None => {
                            accumulated.insert(key, (ordinal, Arc::new(item)));
                        }
                    }
                }
                Err(cause) => {
                    tracing::debug!(path = %path, error = %cause, "content item failed to build");
                    if failure.as_ref().map_or(true, |(first, _)| ordinal < *first) {
                        failure = Some((ordinal, RebuildError::BuildFailure { path, cause }));
                    }
                }
            }
        }

        if let Some((_, err)) = failure {
            return Err(err);
        }

        Ok(accumulated
            .into_iter()
            .map(|(path, (_, item))| (path, item))
            .collect())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
