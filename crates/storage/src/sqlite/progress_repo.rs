use course_core::model::{CourseId, LearnerId, NodeId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{datetime_to_millis, decode_leaf_set, encode_leaf_set, millis_to_datetime, ser};
use crate::repository::{ProgressRecordRow, ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Option<ProgressRecordRow>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, course_id, completed_leaf_ids, last_visited_id, updated_at
            FROM progress
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(learner.as_str())
        .bind(course.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => progress_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert(&self, row: ProgressRecordRow) -> Result<(), StorageError> {
        let completed = encode_leaf_set(&row.completed_leaf_ids)?;
        let last_visited = row.last_visited_id.as_ref().map(NodeId::as_str);
        let updated_at = datetime_to_millis(row.updated_at);

        // The WHERE guard makes concurrent tabs resolve by last-write-wins:
        // a stale upsert leaves the newer stored row in place.
        sqlx::query(
            r"
            INSERT INTO progress (learner_id, course_id, completed_leaf_ids, last_visited_id, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(learner_id, course_id) DO UPDATE SET
                completed_leaf_ids = excluded.completed_leaf_ids,
                last_visited_id = excluded.last_visited_id,
                updated_at = excluded.updated_at
            WHERE excluded.updated_at >= progress.updated_at
            ",
        )
        .bind(row.learner_id.as_str())
        .bind(row.course_id.as_str())
        .bind(completed)
        .bind(last_visited)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_for_learner(
        &self,
        learner: &LearnerId,
    ) -> Result<Vec<ProgressRecordRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT learner_id, course_id, completed_leaf_ids, last_visited_id, updated_at
            FROM progress
            WHERE learner_id = ?1
            ORDER BY course_id ASC
            ",
        )
        .bind(learner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(progress_from_row(&row)?);
        }
        Ok(records)
    }

    async fn delete(&self, learner: &LearnerId, course: &CourseId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            DELETE FROM progress
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(learner.as_str())
        .bind(course.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

fn progress_from_row(row: &SqliteRow) -> Result<ProgressRecordRow, StorageError> {
    let completed = decode_leaf_set(&row.try_get::<String, _>("completed_leaf_ids").map_err(ser)?)?;
    let updated_at =
        millis_to_datetime("updated_at", row.try_get::<i64, _>("updated_at").map_err(ser)?)?;

    Ok(ProgressRecordRow {
        learner_id: LearnerId::new(row.try_get::<String, _>("learner_id").map_err(ser)?),
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        completed_leaf_ids: completed,
        last_visited_id: row
            .try_get::<Option<String>, _>("last_visited_id")
            .map_err(ser)?
            .map(NodeId::new),
        updated_at,
    })
}
