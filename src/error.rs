//! Typed errors for each stage of the rebuild and query pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while making the local content tree available.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("content source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("content directory is missing or empty: {}", .0.display())]
    EmptyContent(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures turning one file into a content item.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("builder panicked: {0}")]
    Panicked(String),
}

/// Failures reported by the full-text engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("invalid query: {0}")]
    Query(String),
}

/// Failures of a rebuild. None of these ever replace the live snapshot.
#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("content source failure: {0}")]
    SourceFailure(#[from] SourceError),

    #[error("there is no content under {}", .0.display())]
    NoContent(PathBuf),

    #[error("failed to walk content tree: {0}")]
    Walk(String),

    #[error("failed to build '{path}': {cause}")]
    BuildFailure { path: String, cause: BuildError },

    #[error("index write failed: {0}")]
    IndexWriteFailure(#[source] EngineError),

    #[error("rebuild produced no entries; ensure content is registered under the content root")]
    EmptyResult,

    #[error("rebuild task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures of a search request.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    #[error(transparent)]
    Engine(#[from] EngineError),
}
