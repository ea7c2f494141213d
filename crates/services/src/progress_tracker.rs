use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use course_core::Clock;
use course_core::model::{
    ContentCatalog, CourseId, LearnerId, NodeId, ProgressRecord, ProgressSummary,
};
use storage::repository::{ProgressRecordRow, ProgressRepository};

use crate::error::ProgressError;
use crate::identity::SessionIdentity;

/// Per-course completion entry for the current learner's course overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewEntry {
    pub course_id: CourseId,
    pub total_leaves: usize,
    pub completed: usize,
    pub percent: u8,
    pub is_complete: bool,
    pub last_visited_id: Option<NodeId>,
}

/// Owns per-course completion state for the current learner.
///
/// This is the only sanctioned way to read or mutate progress: pages consume
/// the same contract instead of re-implementing set-toggling and storage
/// parsing locally. Mutations are synchronous operations on the record held
/// by the caller; persistence is a separate, explicit step so the UI can
/// apply changes optimistically and retry a failed write without losing the
/// in-memory state.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    catalog: Arc<ContentCatalog>,
    progress: Arc<dyn ProgressRepository>,
    identity: Arc<dyn SessionIdentity>,
    anonymous_id: LearnerId,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<ContentCatalog>,
        progress: Arc<dyn ProgressRepository>,
        identity: Arc<dyn SessionIdentity>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            identity,
            anonymous_id: LearnerId::anonymous(),
        }
    }

    /// The key progress is stored under: the signed-in learner, or the
    /// device-local pseudo-id minted when this tracker was built.
    #[must_use]
    pub fn learner_key(&self) -> LearnerId {
        self.identity
            .current_learner_id()
            .unwrap_or_else(|| self.anonymous_id.clone())
    }

    #[must_use]
    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    /// Load persisted progress for a course, or a fresh empty record.
    ///
    /// Absence of persisted data is not an error. Persisted leaf ids that no
    /// longer exist in the catalog (content restructuring) are silently
    /// dropped, so stale ids are never trusted.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` if the catalog has no such
    /// course, or `ProgressError::Persistence` if the read itself fails.
    pub async fn load(&self, course_id: &CourseId) -> Result<ProgressRecord, ProgressError> {
        let valid = self
            .catalog
            .leaf_set(course_id)
            .ok_or_else(|| ProgressError::UnknownCourse(course_id.clone()))?;

        let learner = self.learner_key();
        let Some(row) = self.progress.get(&learner, course_id).await? else {
            debug!(course = %course_id, "no persisted progress, starting fresh");
            return Ok(ProgressRecord::new(course_id.clone(), self.clock.now()));
        };

        let mut record = row.into_record();
        let dropped = record.retain_leaves(valid);
        if dropped > 0 {
            warn!(
                course = %course_id,
                dropped,
                "reconciliation dropped completed ids no longer in the catalog"
            );
        }
        Ok(record)
    }

    /// Flip a leaf's completion state. Two toggles cancel out.
    ///
    /// Returns the leaf's new membership in the completed set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` or `ProgressError::InvalidLeaf`
    /// when the id does not name a leaf of the record's course.
    pub fn toggle_complete(
        &self,
        record: &mut ProgressRecord,
        leaf_id: &NodeId,
    ) -> Result<bool, ProgressError> {
        self.require_leaf(record.course_id(), leaf_id)?;
        Ok(record.toggle_complete(leaf_id.clone(), self.clock.now()))
    }

    /// Unconditionally mark a leaf complete.
    ///
    /// Already-complete leaves are a no-op, not an error; this operation
    /// never regresses a completed item. Returns whether the set changed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` or `ProgressError::InvalidLeaf`
    /// when the id does not name a leaf of the record's course.
    pub fn mark_complete(
        &self,
        record: &mut ProgressRecord,
        leaf_id: &NodeId,
    ) -> Result<bool, ProgressError> {
        self.require_leaf(record.course_id(), leaf_id)?;
        Ok(record.mark_complete(leaf_id.clone(), self.clock.now()))
    }

    /// Record the most recently opened leaf. Completion state is untouched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` or `ProgressError::InvalidLeaf`
    /// when the id does not name a leaf of the record's course.
    pub fn record_visit(
        &self,
        record: &mut ProgressRecord,
        leaf_id: &NodeId,
    ) -> Result<(), ProgressError> {
        self.require_leaf(record.course_id(), leaf_id)?;
        record.record_visit(leaf_id.clone(), self.clock.now());
        Ok(())
    }

    /// Completion percentage for the subtree rooted at `node_id`.
    ///
    /// Integer in `0..=100`, rounded half-up; a zero-leaf node yields 0 and
    /// 100 means every leaf under the node is complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` or `ProgressError::UnknownNode`
    /// when the node does not exist under the record's course.
    pub fn compute_percent(
        &self,
        record: &ProgressRecord,
        node_id: &NodeId,
    ) -> Result<u8, ProgressError> {
        self.summary(record, node_id).map(|s| s.percent)
    }

    /// Aggregated completed/total counts for the subtree rooted at `node_id`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` or `ProgressError::UnknownNode`
    /// when the node does not exist under the record's course.
    pub fn summary(
        &self,
        record: &ProgressRecord,
        node_id: &NodeId,
    ) -> Result<ProgressSummary, ProgressError> {
        let course_id = record.course_id();
        if !self.catalog.contains_course(course_id) {
            return Err(ProgressError::UnknownCourse(course_id.clone()));
        }
        let leaves = self
            .catalog
            .leaves_under(course_id, node_id)
            .ok_or_else(|| ProgressError::UnknownNode {
                course: course_id.clone(),
                node: node_id.clone(),
            })?;
        let completed = leaves.iter().filter(|l| record.is_completed(l)).count();
        Ok(ProgressSummary::from_counts(completed, leaves.len()))
    }

    /// Persist a record under `(learner, course)`, overwriting atomically.
    ///
    /// Concurrent tabs resolve by last-write-wins on `updated_at` inside the
    /// repository.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Persistence` if the write fails; the record
    /// itself is untouched, so the caller can retry.
    pub async fn persist(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        let learner = self.learner_key();
        let row = ProgressRecordRow::from_record(learner, record);
        self.progress.upsert(row).await?;
        debug!(course = %record.course_id(), "persisted progress record");
        Ok(())
    }

    /// Toggle then persist; the optimistic-update path for checkbox UIs.
    ///
    /// # Errors
    ///
    /// Validation errors leave the record untouched. On
    /// `ProgressError::Persistence` the toggle has already been applied in
    /// memory, so the UI stays consistent and can retry the write.
    pub async fn toggle_and_persist(
        &self,
        record: &mut ProgressRecord,
        leaf_id: &NodeId,
    ) -> Result<bool, ProgressError> {
        let now_complete = self.toggle_complete(record, leaf_id)?;
        self.persist(record).await?;
        Ok(now_complete)
    }

    /// Mark complete then persist; the "mark complete and continue" path.
    ///
    /// Skips the write when the leaf was already complete.
    ///
    /// # Errors
    ///
    /// Same contract as [`ProgressTracker::toggle_and_persist`].
    pub async fn mark_complete_and_persist(
        &self,
        record: &mut ProgressRecord,
        leaf_id: &NodeId,
    ) -> Result<(), ProgressError> {
        if self.mark_complete(record, leaf_id)? {
            self.persist(record).await?;
        }
        Ok(())
    }

    /// Record a visit then persist.
    ///
    /// # Errors
    ///
    /// Same contract as [`ProgressTracker::toggle_and_persist`].
    pub async fn record_visit_and_persist(
        &self,
        record: &mut ProgressRecord,
        leaf_id: &NodeId,
    ) -> Result<(), ProgressError> {
        self.record_visit(record, leaf_id)?;
        self.persist(record).await?;
        Ok(())
    }

    /// The resume target: the first uncompleted leaf at or after the last
    /// visited one, wrapping to the start of the course. `None` when every
    /// leaf is complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` if the record's course is not
    /// in the catalog.
    pub fn next_leaf(&self, record: &ProgressRecord) -> Result<Option<NodeId>, ProgressError> {
        let course_id = record.course_id();
        let leaves = self
            .catalog
            .leaves(course_id)
            .ok_or_else(|| ProgressError::UnknownCourse(course_id.clone()))?;

        let start = record
            .last_visited_id()
            .and_then(|cursor| leaves.iter().position(|leaf| leaf == cursor))
            .unwrap_or(0);

        let next = leaves
            .iter()
            .cycle()
            .skip(start)
            .take(leaves.len())
            .find(|leaf| !record.is_completed(leaf))
            .cloned();
        Ok(next)
    }

    /// Discard persisted progress for a course and return a fresh record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCourse` for unknown courses, or
    /// `ProgressError::Persistence` if the delete fails.
    pub async fn reset(&self, course_id: &CourseId) -> Result<ProgressRecord, ProgressError> {
        if !self.catalog.contains_course(course_id) {
            return Err(ProgressError::UnknownCourse(course_id.clone()));
        }
        let learner = self.learner_key();
        self.progress.delete(&learner, course_id).await?;
        Ok(ProgressRecord::new(course_id.clone(), self.clock.now()))
    }

    /// Per-course completion summaries for everything the current learner
    /// has touched, ordered by course id.
    ///
    /// Rows for courses that have left the catalog entirely are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Persistence` if the listing fails.
    pub async fn overview(&self) -> Result<Vec<OverviewEntry>, ProgressError> {
        let learner = self.learner_key();
        let rows = self.progress.list_for_learner(&learner).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let course_id = row.course_id.clone();
            let Some(valid) = self.catalog.leaf_set(&course_id) else {
                warn!(course = %course_id, "skipping progress for course missing from catalog");
                continue;
            };
            let mut record = row.into_record();
            record.retain_leaves(valid);

            let root = NodeId::new(course_id.as_str());
            let summary = self.summary(&record, &root)?;
            entries.push(OverviewEntry {
                course_id,
                total_leaves: summary.total_leaves,
                completed: summary.completed,
                percent: summary.percent,
                is_complete: summary.is_complete,
                last_visited_id: record.last_visited_id().cloned(),
            });
        }
        Ok(entries)
    }

    fn require_leaf(&self, course_id: &CourseId, node_id: &NodeId) -> Result<(), ProgressError> {
        if !self.catalog.contains_course(course_id) {
            return Err(ProgressError::UnknownCourse(course_id.clone()));
        }
        if !self.catalog.is_leaf_of(course_id, node_id) {
            return Err(ProgressError::InvalidLeaf {
                course: course_id.clone(),
                node: node_id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;

    use chrono::Duration;
    use course_core::model::{CatalogDraft, NodeDraft, NodeKind};
    use course_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, StorageError};

    use crate::identity::{AnonymousIdentity, FixedIdentity};

    fn node(id: &str, kind: NodeKind, children: &[&str]) -> NodeDraft {
        NodeDraft {
            id: NodeId::new(id),
            kind,
            children: children.iter().map(|c| NodeId::new(*c)).collect(),
        }
    }

    // ap-statistics: unit1 with topics 1.1..=1.10, unit2 with topics 2.1, 2.2.
    fn catalog() -> Arc<ContentCatalog> {
        let topic_ids: Vec<String> = (1..=10).map(|i| format!("1.{i}")).collect();
        let mut nodes = vec![
            node("ap-statistics", NodeKind::Course, &["unit1", "unit2"]),
            node(
                "unit1",
                NodeKind::Unit,
                &topic_ids.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            node("unit2", NodeKind::Unit, &["2.1", "2.2"]),
            node("2.1", NodeKind::Topic, &[]),
            node("2.2", NodeKind::Topic, &[]),
        ];
        for id in &topic_ids {
            nodes.push(node(id, NodeKind::Topic, &[]));
        }
        Arc::new(CatalogDraft { nodes }.validate().unwrap())
    }

    fn tracker_with(repo: InMemoryRepository) -> ProgressTracker {
        ProgressTracker::new(
            fixed_clock(),
            catalog(),
            Arc::new(repo),
            Arc::new(FixedIdentity::new(LearnerId::new("learner-1"))),
        )
    }

    fn course() -> CourseId {
        CourseId::new("ap-statistics")
    }

    #[tokio::test]
    async fn load_returns_fresh_record_for_unseen_course() {
        let tracker = tracker_with(InMemoryRepository::new());
        let record = tracker.load(&course()).await.unwrap();

        assert!(record.completed_leaf_ids().is_empty());
        assert!(record.last_visited_id().is_none());
        assert_eq!(
            tracker
                .compute_percent(&record, &NodeId::new("ap-statistics"))
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn load_rejects_unknown_course() {
        let tracker = tracker_with(InMemoryRepository::new());
        let err = tracker.load(&CourseId::new("underwater-basketry")).await;
        assert!(matches!(err, Err(ProgressError::UnknownCourse(_))));
    }

    #[tokio::test]
    async fn toggle_round_trip_restores_prior_state() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        assert!(tracker.toggle_complete(&mut record, &NodeId::new("1.1")).unwrap());
        assert_eq!(record.completed_leaf_ids().len(), 1);

        assert!(!tracker.toggle_complete(&mut record, &NodeId::new("1.1")).unwrap());
        assert!(record.completed_leaf_ids().is_empty());
    }

    #[tokio::test]
    async fn mutators_reject_non_leaf_ids() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        for bad in ["unit1", "ap-statistics", "9.99"] {
            let err = tracker
                .toggle_complete(&mut record, &NodeId::new(bad))
                .unwrap_err();
            assert!(matches!(err, ProgressError::InvalidLeaf { .. }), "{bad}");
        }
        assert!(record.completed_leaf_ids().is_empty());
    }

    #[tokio::test]
    async fn half_of_unit1_reads_fifty_percent() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        for i in 1..=5 {
            tracker
                .mark_complete(&mut record, &NodeId::new(format!("1.{i}")))
                .unwrap();
        }

        assert_eq!(
            tracker.compute_percent(&record, &NodeId::new("unit1")).unwrap(),
            50
        );
        // 5 of 12 course leaves: 41.67 rounds to 42.
        assert_eq!(
            tracker
                .compute_percent(&record, &NodeId::new("ap-statistics"))
                .unwrap(),
            42
        );
        assert_eq!(
            tracker.compute_percent(&record, &NodeId::new("unit2")).unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn percent_is_monotone_under_additional_completions() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        let mut last = 0;
        for i in 1..=10 {
            tracker
                .mark_complete(&mut record, &NodeId::new(format!("1.{i}")))
                .unwrap();
            let percent = tracker
                .compute_percent(&record, &NodeId::new("ap-statistics"))
                .unwrap();
            assert!(percent >= last);
            last = percent;
        }
        assert_eq!(
            tracker.compute_percent(&record, &NodeId::new("unit1")).unwrap(),
            100
        );
    }

    #[tokio::test]
    async fn percent_of_single_leaf_is_all_or_nothing() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        assert_eq!(
            tracker.compute_percent(&record, &NodeId::new("2.1")).unwrap(),
            0
        );
        tracker.mark_complete(&mut record, &NodeId::new("2.1")).unwrap();
        assert_eq!(
            tracker.compute_percent(&record, &NodeId::new("2.1")).unwrap(),
            100
        );
    }

    #[tokio::test]
    async fn compute_percent_rejects_foreign_nodes() {
        let tracker = tracker_with(InMemoryRepository::new());
        let record = tracker.load(&course()).await.unwrap();

        let err = tracker
            .compute_percent(&record, &NodeId::new("ghost-unit"))
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownNode { .. }));
    }

    #[tokio::test]
    async fn mark_complete_twice_is_one_write() {
        let repo = InMemoryRepository::new();
        let tracker = tracker_with(repo.clone());
        let mut record = tracker.load(&course()).await.unwrap();

        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new("1.1"))
            .await
            .unwrap();
        let first = record.clone();

        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new("1.1"))
            .await
            .unwrap();
        assert_eq!(record, first);

        let reloaded = tracker.load(&course()).await.unwrap();
        assert_eq!(reloaded.completed_leaf_ids(), first.completed_leaf_ids());
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        tracker.mark_complete(&mut record, &NodeId::new("1.1")).unwrap();
        tracker.mark_complete(&mut record, &NodeId::new("2.2")).unwrap();
        tracker.record_visit(&mut record, &NodeId::new("2.2")).unwrap();
        tracker.persist(&record).await.unwrap();

        let reloaded = tracker.load(&course()).await.unwrap();
        assert_eq!(reloaded, record);
    }

    #[tokio::test]
    async fn load_reconciles_stale_leaf_ids() {
        let repo = InMemoryRepository::new();

        // A record persisted before "1.99" was removed from the catalog.
        let completed: BTreeSet<NodeId> =
            [NodeId::new("1.1"), NodeId::new("1.99")].into();
        repo.upsert(ProgressRecordRow {
            learner_id: LearnerId::new("learner-1"),
            course_id: course(),
            completed_leaf_ids: completed,
            last_visited_id: Some(NodeId::new("1.99")),
            updated_at: fixed_now(),
        })
        .await
        .unwrap();

        let tracker = tracker_with(repo);
        let record = tracker.load(&course()).await.unwrap();

        assert!(record.is_completed(&NodeId::new("1.1")));
        assert!(!record.is_completed(&NodeId::new("1.99")));
        assert_eq!(record.last_visited_id(), None);
    }

    #[tokio::test]
    async fn next_leaf_resumes_from_cursor_and_wraps() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();

        // Fresh record starts at the first leaf.
        assert_eq!(tracker.next_leaf(&record).unwrap(), Some(NodeId::new("1.1")));

        tracker.record_visit(&mut record, &NodeId::new("2.1")).unwrap();
        tracker.mark_complete(&mut record, &NodeId::new("2.1")).unwrap();
        assert_eq!(tracker.next_leaf(&record).unwrap(), Some(NodeId::new("2.2")));

        // Everything after the cursor is complete; wrap to the start.
        tracker.mark_complete(&mut record, &NodeId::new("2.2")).unwrap();
        assert_eq!(tracker.next_leaf(&record).unwrap(), Some(NodeId::new("1.1")));

        for i in 1..=10 {
            tracker
                .mark_complete(&mut record, &NodeId::new(format!("1.{i}")))
                .unwrap();
        }
        assert_eq!(tracker.next_leaf(&record).unwrap(), None);
    }

    #[tokio::test]
    async fn reset_discards_persisted_progress() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();
        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new("1.1"))
            .await
            .unwrap();

        let fresh = tracker.reset(&course()).await.unwrap();
        assert!(fresh.completed_leaf_ids().is_empty());

        let reloaded = tracker.load(&course()).await.unwrap();
        assert!(reloaded.completed_leaf_ids().is_empty());
    }

    #[tokio::test]
    async fn overview_summarizes_each_touched_course() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();
        for i in 1..=6 {
            tracker
                .mark_complete(&mut record, &NodeId::new(format!("1.{i}")))
                .unwrap();
        }
        tracker.record_visit(&mut record, &NodeId::new("1.6")).unwrap();
        tracker.persist(&record).await.unwrap();

        let overview = tracker.overview().await.unwrap();
        assert_eq!(overview.len(), 1);
        let entry = &overview[0];
        assert_eq!(entry.course_id, course());
        assert_eq!(entry.total_leaves, 12);
        assert_eq!(entry.completed, 6);
        assert_eq!(entry.percent, 50);
        assert!(!entry.is_complete);
        assert_eq!(entry.last_visited_id, Some(NodeId::new("1.6")));
    }

    #[tokio::test]
    async fn overview_entries_serialize_for_the_ui() {
        let tracker = tracker_with(InMemoryRepository::new());
        let mut record = tracker.load(&course()).await.unwrap();
        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new("2.1"))
            .await
            .unwrap();

        let overview = tracker.overview().await.unwrap();
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json[0]["course_id"], "ap-statistics");
        assert_eq!(json[0]["completed"], 1);
    }

    #[tokio::test]
    async fn anonymous_sessions_keep_a_stable_key() {
        let repo = InMemoryRepository::new();
        let tracker = ProgressTracker::new(
            fixed_clock(),
            catalog(),
            Arc::new(repo),
            Arc::new(AnonymousIdentity),
        );

        let mut record = tracker.load(&course()).await.unwrap();
        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new("1.1"))
            .await
            .unwrap();

        // Same tracker instance sees its own anonymous progress.
        let reloaded = tracker.load(&course()).await.unwrap();
        assert!(reloaded.is_completed(&NodeId::new("1.1")));
    }

    /// Repository that accepts reads but fails every write.
    #[derive(Clone, Default)]
    struct FailingRepository;

    #[async_trait::async_trait]
    impl ProgressRepository for FailingRepository {
        async fn get(
            &self,
            _learner: &LearnerId,
            _course: &CourseId,
        ) -> Result<Option<ProgressRecordRow>, StorageError> {
            Ok(None)
        }

        async fn upsert(&self, _row: ProgressRecordRow) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk on fire".into()))
        }

        async fn list_for_learner(
            &self,
            _learner: &LearnerId,
        ) -> Result<Vec<ProgressRecordRow>, StorageError> {
            Ok(Vec::new())
        }

        async fn delete(
            &self,
            _learner: &LearnerId,
            _course: &CourseId,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn failed_persist_keeps_the_in_memory_toggle() {
        let tracker = ProgressTracker::new(
            fixed_clock(),
            catalog(),
            Arc::new(FailingRepository),
            Arc::new(FixedIdentity::new(LearnerId::new("learner-1"))),
        );

        let mut record = tracker.load(&course()).await.unwrap();
        let err = tracker
            .toggle_and_persist(&mut record, &NodeId::new("1.1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProgressError::Persistence(_)));
        // Optimistic update: the toggle survives so the UI can retry the write.
        assert!(record.is_completed(&NodeId::new("1.1")));
    }

    #[tokio::test]
    async fn updated_at_follows_the_clock() {
        let repo = InMemoryRepository::new();
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(1));
        let tracker = ProgressTracker::new(
            clock,
            catalog(),
            Arc::new(repo),
            Arc::new(FixedIdentity::new(LearnerId::new("learner-1"))),
        );

        let mut record = tracker.load(&course()).await.unwrap();
        tracker.toggle_complete(&mut record, &NodeId::new("1.1")).unwrap();
        assert_eq!(record.updated_at(), fixed_now() + Duration::hours(1));
    }
}
