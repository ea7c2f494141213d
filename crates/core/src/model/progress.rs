use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::model::ids::{CourseId, NodeId};

/// Per-learner completion state for a single course.
///
/// Created lazily on first interaction, mutated in memory by the progress
/// tracker, and persisted as a whole. The record itself performs no catalog
/// validation; the service layer validates ids before calling the mutators
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    course_id: CourseId,
    completed_leaf_ids: BTreeSet<NodeId>,
    last_visited_id: Option<NodeId>,
    updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Creates a fresh, empty record for a course.
    #[must_use]
    pub fn new(course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            course_id,
            completed_leaf_ids: BTreeSet::new(),
            last_visited_id: None,
            updated_at: now,
        }
    }

    /// Rebuilds a record from its persisted parts.
    #[must_use]
    pub fn from_persisted(
        course_id: CourseId,
        completed_leaf_ids: BTreeSet<NodeId>,
        last_visited_id: Option<NodeId>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id,
            completed_leaf_ids,
            last_visited_id,
            updated_at,
        }
    }

    // Accessors
    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn completed_leaf_ids(&self) -> &BTreeSet<NodeId> {
        &self.completed_leaf_ids
    }

    #[must_use]
    pub fn last_visited_id(&self) -> Option<&NodeId> {
        self.last_visited_id.as_ref()
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn is_completed(&self, leaf_id: &NodeId) -> bool {
        self.completed_leaf_ids.contains(leaf_id)
    }

    /// Unconditionally marks a leaf complete.
    ///
    /// Returns whether the set changed. Already-complete leaves are a no-op,
    /// not an error, and leave `updated_at` untouched so a no-op never wins
    /// last-write-wins against a real edit.
    pub fn mark_complete(&mut self, leaf_id: NodeId, now: DateTime<Utc>) -> bool {
        let inserted = self.completed_leaf_ids.insert(leaf_id);
        if inserted {
            self.updated_at = now;
        }
        inserted
    }

    /// Flips a leaf's completion state and returns the new membership.
    ///
    /// Two toggles cancel out; this is the click-to-complete,
    /// click-again-to-undo flow, so a toggle is always a mutation.
    pub fn toggle_complete(&mut self, leaf_id: NodeId, now: DateTime<Utc>) -> bool {
        self.updated_at = now;
        if self.completed_leaf_ids.remove(&leaf_id) {
            false
        } else {
            self.completed_leaf_ids.insert(leaf_id);
            true
        }
    }

    /// Records the most recently opened leaf. Completion state is untouched.
    pub fn record_visit(&mut self, leaf_id: NodeId, now: DateTime<Utc>) {
        self.last_visited_id = Some(leaf_id);
        self.updated_at = now;
    }

    /// Drops completed ids (and a stale visit cursor) that are not in the
    /// given valid-leaf set. Returns how many completed ids were dropped.
    ///
    /// Used on load to reconcile persisted state against the current catalog
    /// after content restructuring.
    pub fn retain_leaves(&mut self, valid: &BTreeSet<NodeId>) -> usize {
        let before = self.completed_leaf_ids.len();
        self.completed_leaf_ids.retain(|id| valid.contains(id));
        if let Some(cursor) = &self.last_visited_id {
            if !valid.contains(cursor) {
                self.last_visited_id = None;
            }
        }
        before - self.completed_leaf_ids.len()
    }
}

/// Aggregated completion view for a subtree, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total_leaves: usize,
    pub completed: usize,
    pub percent: u8,
    pub is_complete: bool,
}

impl ProgressSummary {
    #[must_use]
    pub fn from_counts(completed: usize, total_leaves: usize) -> Self {
        Self {
            total_leaves,
            completed,
            percent: rounded_percent(completed, total_leaves),
            is_complete: total_leaves > 0 && completed == total_leaves,
        }
    }
}

/// Integer percentage in `0..=100`, rounded half-up.
///
/// A zero-leaf subtree yields 0 rather than dividing by zero, and 100 is
/// returned only when every leaf is complete; a 99.5% course reads as 99,
/// never as done.
#[must_use]
pub fn rounded_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    if completed == total {
        return 100;
    }
    let pct = (200 * completed as u64 + total as u64) / (2 * total as u64);
    u8::try_from(pct.min(99)).unwrap_or(99)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
