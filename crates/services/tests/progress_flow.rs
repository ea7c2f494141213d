//! End-to-end progress flows: the lesson-viewer loop of visiting a section,
//! marking it complete, and resuming later in a new session.

use std::sync::Arc;

use course_core::model::{
    CatalogDraft, ContentCatalog, CourseId, LearnerId, NodeDraft, NodeId, NodeKind,
};
use course_core::time::fixed_clock;
use services::identity::FixedIdentity;
use services::progress_tracker::ProgressTracker;
use storage::repository::InMemoryRepository;

fn node(id: &str, kind: NodeKind, children: &[&str]) -> NodeDraft {
    NodeDraft {
        id: NodeId::new(id),
        kind,
        children: children.iter().map(|c| NodeId::new(*c)).collect(),
    }
}

// ap-statistics: unit1 → topic 1.1 → sections 1.1a/1.1b, unit1 → topic 1.2,
// unit2 → topic 2.1.
fn catalog() -> Arc<ContentCatalog> {
    let draft = CatalogDraft {
        nodes: vec![
            node("ap-statistics", NodeKind::Course, &["unit1", "unit2"]),
            node("unit1", NodeKind::Unit, &["1.1", "1.2"]),
            node("unit2", NodeKind::Unit, &["2.1"]),
            node("1.1", NodeKind::Topic, &["1.1a", "1.1b"]),
            node("1.2", NodeKind::Topic, &[]),
            node("2.1", NodeKind::Topic, &[]),
            node("1.1a", NodeKind::Section, &[]),
            node("1.1b", NodeKind::Section, &[]),
        ],
    };
    Arc::new(draft.validate().unwrap())
}

fn tracker(repo: InMemoryRepository) -> ProgressTracker {
    ProgressTracker::new(
        fixed_clock(),
        catalog(),
        Arc::new(repo),
        Arc::new(FixedIdentity::new(LearnerId::new("learner-1"))),
    )
}

#[tokio::test]
async fn lesson_viewer_flow_survives_a_reload() {
    let repo = InMemoryRepository::new();
    let course = CourseId::new("ap-statistics");

    // First session: open section 1.1a, finish it, continue into 1.1b.
    {
        let tracker = tracker(repo.clone());
        let mut record = tracker.load(&course).await.unwrap();

        tracker
            .record_visit_and_persist(&mut record, &NodeId::new("1.1a"))
            .await
            .unwrap();
        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new("1.1a"))
            .await
            .unwrap();

        assert_eq!(
            tracker.next_leaf(&record).unwrap(),
            Some(NodeId::new("1.1b"))
        );
    }

    // Second session: a fresh tracker over the same store resumes where the
    // learner left off.
    let tracker = tracker(repo);
    let record = tracker.load(&course).await.unwrap();

    assert!(record.is_completed(&NodeId::new("1.1a")));
    assert_eq!(record.last_visited_id(), Some(&NodeId::new("1.1a")));
    assert_eq!(
        tracker.next_leaf(&record).unwrap(),
        Some(NodeId::new("1.1b"))
    );

    // 1 of 3 topic-level leaves under unit1 done: 2 sections + topic 1.2.
    assert_eq!(
        tracker
            .compute_percent(&record, &NodeId::new("unit1"))
            .unwrap(),
        33
    );
    assert_eq!(
        tracker
            .compute_percent(&record, &NodeId::new("1.1"))
            .unwrap(),
        50
    );
}

#[tokio::test]
async fn completing_every_leaf_reads_one_hundred_everywhere() {
    let repo = InMemoryRepository::new();
    let course = CourseId::new("ap-statistics");
    let tracker = tracker(repo);
    let mut record = tracker.load(&course).await.unwrap();

    for leaf in ["1.1a", "1.1b", "1.2", "2.1"] {
        tracker
            .mark_complete_and_persist(&mut record, &NodeId::new(leaf))
            .await
            .unwrap();
    }

    for nodes in ["ap-statistics", "unit1", "unit2", "1.1"] {
        assert_eq!(
            tracker
                .compute_percent(&record, &NodeId::new(nodes))
                .unwrap(),
            100,
            "{nodes}"
        );
    }
    assert_eq!(tracker.next_leaf(&record).unwrap(), None);

    let overview = tracker.overview().await.unwrap();
    assert_eq!(overview.len(), 1);
    assert!(overview[0].is_complete);
}

#[tokio::test]
async fn two_learners_do_not_share_progress() {
    let repo = InMemoryRepository::new();
    let course = CourseId::new("ap-statistics");

    let first = tracker(repo.clone());
    let mut record = first.load(&course).await.unwrap();
    first
        .mark_complete_and_persist(&mut record, &NodeId::new("1.2"))
        .await
        .unwrap();

    let second = ProgressTracker::new(
        fixed_clock(),
        catalog(),
        Arc::new(repo),
        Arc::new(FixedIdentity::new(LearnerId::new("learner-2"))),
    );
    let other = second.load(&course).await.unwrap();
    assert!(other.completed_leaf_ids().is_empty());
}
