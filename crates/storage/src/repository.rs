use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{CourseId, LearnerId, NodeId, ProgressRecord};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// Callers treat these as environmental: the in-memory mutation that
/// preceded a failed write is still valid and may be retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a learner × course progress record.
///
/// This mirrors the domain `ProgressRecord` plus its owning learner so
/// repositories can serialize without leaking storage concerns into the
/// domain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecordRow {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub completed_leaf_ids: BTreeSet<NodeId>,
    pub last_visited_id: Option<NodeId>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecordRow {
    #[must_use]
    pub fn from_record(learner_id: LearnerId, record: &ProgressRecord) -> Self {
        Self {
            learner_id,
            course_id: record.course_id().clone(),
            completed_leaf_ids: record.completed_leaf_ids().clone(),
            last_visited_id: record.last_visited_id().cloned(),
            updated_at: record.updated_at(),
        }
    }

    /// Convert the row back into a domain `ProgressRecord`.
    #[must_use]
    pub fn into_record(self) -> ProgressRecord {
        ProgressRecord::from_persisted(
            self.course_id,
            self.completed_leaf_ids,
            self.last_visited_id,
            self.updated_at,
        )
    }
}

/// Repository contract for progress records, keyed by `(learner, course)`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for a learner and course.
    ///
    /// Absence of data is not an error: returns `Ok(None)` when nothing has
    /// been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read itself fails.
    async fn get(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Option<ProgressRecordRow>, StorageError>;

    /// Persist a record, overwriting any prior value atomically.
    ///
    /// Concurrent writers resolve by last-write-wins on `updated_at`: an
    /// upsert carrying an older timestamp than the stored row leaves the
    /// stored row in place and still returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert(&self, row: ProgressRecordRow) -> Result<(), StorageError>;

    /// All records for a learner, ordered by course id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails.
    async fn list_for_learner(
        &self,
        learner: &LearnerId,
    ) -> Result<Vec<ProgressRecordRow>, StorageError>;

    /// Remove the record for a learner and course. Deleting an absent record
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete(&self, learner: &LearnerId, course: &CourseId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    rows: Arc<Mutex<HashMap<(LearnerId, CourseId), ProgressRecordRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Option<ProgressRecordRow>, StorageError> {
        let guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(learner.clone(), course.clone())).cloned())
    }

    async fn upsert(&self, row: ProgressRecordRow) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (row.learner_id.clone(), row.course_id.clone());
        match guard.get(&key) {
            Some(existing) if existing.updated_at > row.updated_at => {}
            _ => {
                guard.insert(key, row);
            }
        }
        Ok(())
    }

    async fn list_for_learner(
        &self,
        learner: &LearnerId,
    ) -> Result<Vec<ProgressRecordRow>, StorageError> {
        let guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<ProgressRecordRow> = guard
            .values()
            .filter(|row| &row.learner_id == learner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.course_id.cmp(&b.course_id));
        Ok(rows)
    }

    async fn delete(&self, learner: &LearnerId, course: &CourseId) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&(learner.clone(), course.clone()));
        Ok(())
    }
}

/// Aggregates progress persistence behind a trait object for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            progress: Arc::new(repo),
        }
    }
}
