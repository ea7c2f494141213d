use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, NodeId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog contains no courses")]
    EmptyCatalog,

    #[error("node id cannot be empty")]
    EmptyNodeId,

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("node {parent} references undefined child {child}")]
    UnknownChild { parent: NodeId, child: NodeId },

    #[error("node {child} is claimed by more than one parent")]
    ChildClaimedTwice { child: NodeId },

    #[error("node {child} cannot be a child of {parent}: {expected} expected")]
    WrongChildKind {
        parent: NodeId,
        child: NodeId,
        expected: NodeKind,
    },

    #[error("section {0} cannot have children")]
    SectionWithChildren(NodeId),

    #[error("course node {0} cannot appear as a child")]
    CourseAsChild(NodeId),

    #[error("node {0} is not reachable from any course root")]
    UnreachableNode(NodeId),
}

//
// ─── NODES ─────────────────────────────────────────────────────────────────────
//

/// Level of a node in the course → unit → topic → section hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Course,
    Unit,
    Topic,
    Section,
}

impl NodeKind {
    /// The kind a direct child of this node must have, or `None` for the
    /// bottom of the hierarchy.
    #[must_use]
    pub fn child_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Course => Some(NodeKind::Unit),
            NodeKind::Unit => Some(NodeKind::Topic),
            NodeKind::Topic => Some(NodeKind::Section),
            NodeKind::Section => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NodeKind::Course => "course",
            NodeKind::Unit => "unit",
            NodeKind::Topic => "topic",
            NodeKind::Section => "section",
        };
        write!(f, "{label}")
    }
}

/// A single node of the validated content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    id: NodeId,
    kind: NodeKind,
    children: Vec<NodeId>,
}

impl ContentNode {
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Ordered child ids. Empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// A completable leaf: a childless topic or section. Childless courses
    /// and units are merely empty, not completable.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
            && matches!(self.kind, NodeKind::Topic | NodeKind::Section)
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Raw, unvalidated node as it appears in a catalog manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDraft {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

/// Unvalidated catalog shape, typically deserialized from a JSON manifest.
///
/// Validation happens exactly once, in [`CatalogDraft::validate`]; everything
/// downstream consumes the resulting [`ContentCatalog`] through typed
/// accessors and never re-checks tree shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDraft {
    pub nodes: Vec<NodeDraft>,
}

impl CatalogDraft {
    /// Parse a draft from a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the manifest is malformed.
    pub fn from_json(manifest: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(manifest)
    }

    /// Validate the draft into an immutable `ContentCatalog`.
    ///
    /// Courses are the nodes of kind `course`; their ids double as course
    /// ids. The tree must be a forest: every non-course node has exactly one
    /// parent, every child is exactly one level below its parent, and
    /// sections have no children.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` describing the first structural violation found.
    pub fn validate(self) -> Result<ContentCatalog, CatalogError> {
        let mut nodes: HashMap<NodeId, ContentNode> = HashMap::with_capacity(self.nodes.len());
        let mut order: Vec<NodeId> = Vec::with_capacity(self.nodes.len());

        for draft in self.nodes {
            if draft.id.as_str().is_empty() {
                return Err(CatalogError::EmptyNodeId);
            }
            let node = ContentNode {
                id: draft.id.clone(),
                kind: draft.kind,
                children: draft.children,
            };
            if nodes.insert(draft.id.clone(), node).is_some() {
                return Err(CatalogError::DuplicateNode(draft.id));
            }
            order.push(draft.id);
        }

        let mut parent_of: HashMap<NodeId, NodeId> = HashMap::new();
        for id in &order {
            let node = &nodes[id];
            for child in node.children() {
                let Some(child_node) = nodes.get(child) else {
                    return Err(CatalogError::UnknownChild {
                        parent: id.clone(),
                        child: child.clone(),
                    });
                };
                match node.kind().child_kind() {
                    None => return Err(CatalogError::SectionWithChildren(id.clone())),
                    Some(_) if child_node.kind() == NodeKind::Course => {
                        return Err(CatalogError::CourseAsChild(child.clone()));
                    }
                    Some(expected) if child_node.kind() != expected => {
                        return Err(CatalogError::WrongChildKind {
                            parent: id.clone(),
                            child: child.clone(),
                            expected,
                        });
                    }
                    Some(_) => {}
                }
                if parent_of.insert(child.clone(), id.clone()).is_some() {
                    return Err(CatalogError::ChildClaimedTwice {
                        child: child.clone(),
                    });
                }
            }
        }

        let roots: Vec<NodeId> = order
            .iter()
            .filter(|id| nodes[*id].kind() == NodeKind::Course)
            .cloned()
            .collect();
        if roots.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        // Walk each course and assign every reachable node to it. The strict
        // kind-nesting rule above rules out cycles, so a plain DFS terminates.
        let mut course_of: HashMap<NodeId, CourseId> = HashMap::new();
        let mut course_order: Vec<CourseId> = Vec::with_capacity(roots.len());
        let mut course_leaves: HashMap<CourseId, Vec<NodeId>> = HashMap::new();
        let mut leaf_sets: HashMap<CourseId, BTreeSet<NodeId>> = HashMap::new();

        for root in &roots {
            let course_id = CourseId::new(root.as_str());
            let mut leaves = Vec::new();
            let mut stack = vec![root.clone()];
            while let Some(id) = stack.pop() {
                let node = &nodes[&id];
                if node.is_leaf() {
                    leaves.push(id.clone());
                }
                course_of.insert(id.clone(), course_id.clone());
                for child in node.children().iter().rev() {
                    stack.push(child.clone());
                }
            }
            leaf_sets.insert(course_id.clone(), leaves.iter().cloned().collect());
            course_leaves.insert(course_id.clone(), leaves);
            course_order.push(course_id);
        }

        for id in &order {
            if !course_of.contains_key(id) {
                return Err(CatalogError::UnreachableNode(id.clone()));
            }
        }

        Ok(ContentCatalog {
            nodes,
            course_order,
            course_of,
            course_leaves,
            leaf_sets,
        })
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Immutable, validated content tree for one or more courses.
///
/// The tree is static for the lifetime of a session; ids never change
/// meaning. All progress lookups go through these accessors.
#[derive(Debug, Clone)]
pub struct ContentCatalog {
    nodes: HashMap<NodeId, ContentNode>,
    course_order: Vec<CourseId>,
    course_of: HashMap<NodeId, CourseId>,
    course_leaves: HashMap<CourseId, Vec<NodeId>>,
    leaf_sets: HashMap<CourseId, BTreeSet<NodeId>>,
}

impl ContentCatalog {
    /// Course ids in manifest order.
    #[must_use]
    pub fn courses(&self) -> &[CourseId] {
        &self.course_order
    }

    #[must_use]
    pub fn contains_course(&self, course_id: &CourseId) -> bool {
        self.course_leaves.contains_key(course_id)
    }

    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&ContentNode> {
        self.nodes.get(node_id)
    }

    /// Ordered children of a node, or `None` if the node is unknown.
    #[must_use]
    pub fn children(&self, node_id: &NodeId) -> Option<&[NodeId]> {
        self.nodes.get(node_id).map(ContentNode::children)
    }

    /// Ordered (document-order) leaf ids under a course root.
    #[must_use]
    pub fn leaves(&self, course_id: &CourseId) -> Option<&[NodeId]> {
        self.course_leaves.get(course_id).map(Vec::as_slice)
    }

    /// The set of valid leaf ids for a course, used for reconciliation.
    #[must_use]
    pub fn leaf_set(&self, course_id: &CourseId) -> Option<&BTreeSet<NodeId>> {
        self.leaf_sets.get(course_id)
    }

    /// True if `node_id` exists somewhere under `course_id`.
    #[must_use]
    pub fn contains(&self, course_id: &CourseId, node_id: &NodeId) -> bool {
        self.course_of.get(node_id) == Some(course_id)
    }

    /// True if `node_id` is a completable leaf of `course_id`.
    #[must_use]
    pub fn is_leaf_of(&self, course_id: &CourseId, node_id: &NodeId) -> bool {
        self.leaf_sets
            .get(course_id)
            .is_some_and(|set| set.contains(node_id))
    }

    /// Ordered leaves of the subtree rooted at `node_id`.
    ///
    /// Returns `None` when the node does not exist under the given course.
    #[must_use]
    pub fn leaves_under(&self, course_id: &CourseId, node_id: &NodeId) -> Option<Vec<NodeId>> {
        if !self.contains(course_id, node_id) {
            return None;
        }
        let mut leaves = Vec::new();
        let mut stack = vec![node_id.clone()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[&id];
            if node.is_leaf() {
                leaves.push(id);
                continue;
            }
            for child in node.children().iter().rev() {
                stack.push(child.clone());
            }
        }
        Some(leaves)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
