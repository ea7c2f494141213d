//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{CatalogError, CourseId, NodeId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressTracker`.
///
/// `UnknownCourse`, `UnknownNode`, and `InvalidLeaf` indicate a
/// catalog/navigation mismatch in the caller and should fail loudly rather
/// than be swallowed. `Persistence` is environmental: the in-memory effect of
/// the attempted operation has already been applied, so the caller may retry
/// the write or accept ephemeral state for the session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown course: {0}")]
    UnknownCourse(CourseId),

    #[error("node {node} does not exist under course {course}")]
    UnknownNode { course: CourseId, node: NodeId },

    #[error("node {node} is not a completable leaf of course {course}")]
    InvalidLeaf { course: CourseId, node: NodeId },

    #[error(transparent)]
    Persistence(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
