pub mod catalog;
mod ids;
pub mod progress;

pub use catalog::{CatalogDraft, CatalogError, ContentCatalog, ContentNode, NodeDraft, NodeKind};
pub use ids::{CourseId, LearnerId, NodeId};
pub use progress::{ProgressRecord, ProgressSummary, rounded_percent};
