use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use course_core::model::NodeId;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn datetime_to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub(crate) fn millis_to_datetime(field: &'static str, v: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp_millis(v)
        .ok_or_else(|| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn encode_leaf_set(leaves: &BTreeSet<NodeId>) -> Result<String, StorageError> {
    serde_json::to_string(leaves).map_err(ser)
}

pub(crate) fn decode_leaf_set(raw: &str) -> Result<BTreeSet<NodeId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}
