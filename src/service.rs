//! The index service: owner of the live snapshot.
//!
//! [`IndexService`] ties together the content source gate, the document
//! builder, the engine writer and the event publisher. The current
//! [`Index`] sits behind an [`ArcSwap`]: readers load the reference once per
//! call and never block, while a rebuild prepares a replacement off to the
//! side and publishes it with a single store. Rebuilds are serialized by an
//! async mutex.
//!
//! The rebuild itself lives in [`crate::rebuild`] and the query path in
//! [`crate::search`].

use anyhow::Result;
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::builder::{DocumentBuilder, FrontMatterBuilder};
use crate::config::Config;
use crate::engine::{SearchEngine, SqliteEngine};
use crate::events::{EventPublisher, IndexEventListener, TracingListener};
use crate::identity::IdentityHasher;
use crate::models::Index;
use crate::scan::ContentFilter;
use crate::source::{ContentSourceGate, GitSource, VersionedSource};
use crate::writer::IndexWriter;

pub struct IndexService {
    pub(crate) gate: ContentSourceGate,
    pub(crate) content_dir: PathBuf,
    pub(crate) filter: ContentFilter,
    pub(crate) builder: Arc<dyn DocumentBuilder>,
    pub(crate) writer: IndexWriter,
    pub(crate) engine: Arc<dyn SearchEngine>,
    pub(crate) events: EventPublisher,
    pub(crate) current: ArcSwap<Index>,
    pub(crate) rebuild_lock: Mutex<()>,
}

impl IndexService {
    /// Assemble a service from its collaborators. The live index starts empty.
    pub fn new(
        gate: ContentSourceGate,
        content_dir: impl Into<PathBuf>,
        filter: ContentFilter,
        builder: Arc<dyn DocumentBuilder>,
        hasher: IdentityHasher,
        engine: Arc<dyn SearchEngine>,
        events: EventPublisher,
    ) -> Self {
        Self {
            gate,
            content_dir: content_dir.into(),
            filter,
            builder,
            writer: IndexWriter::new(hasher, engine.clone()),
            engine,
            events,
            current: ArcSwap::from_pointee(Index::default()),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Wire up the standard stack from configuration: git source, front-matter
    /// builder, SQLite engine, and a tracing listener plus any `extra`
    /// listeners.
    pub async fn from_config(
        config: &Config,
        extra: Vec<Arc<dyn IndexEventListener>>,
    ) -> Result<Self> {
        let source: Option<Arc<dyn VersionedSource>> = config
            .source
            .as_ref()
            .map(|s| Arc::new(GitSource::from_config(s)) as Arc<dyn VersionedSource>);
        let gate = ContentSourceGate::new(config.content_root(), config.reset_on_rebuild(), source);

        let engine = SqliteEngine::open(&config.db.path).await?;

        let mut events = EventPublisher::new();
        events.subscribe(Arc::new(TracingListener));
        for listener in extra {
            events.subscribe(listener);
        }

        Ok(Self::new(
            gate,
            config.content_dir(),
            ContentFilter::from_config(&config.content)?,
            Arc::new(FrontMatterBuilder::new(config.content.date_format.clone())),
            IdentityHasher::new(config.index.key_date_format.clone()),
            Arc::new(engine),
            events,
        ))
    }

    /// The live snapshot. Cheap; holds no lock.
    pub fn snapshot(&self) -> Arc<Index> {
        self.current.load_full()
    }

    pub fn hasher(&self) -> &IdentityHasher {
        self.writer.hasher()
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    /// True while a rebuild holds the rebuild lock.
    pub fn is_rebuilding(&self) -> bool {
        self.rebuild_lock.try_lock().is_err()
    }
}
