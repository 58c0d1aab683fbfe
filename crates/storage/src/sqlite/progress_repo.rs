use async_trait::async_trait;
use recruit_core::model::{PersistedProgress, ScheduleId};

use super::SqliteRepository;
use super::mapping::{map_progress_row, schedule_id_to_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        schedule: ScheduleId,
    ) -> Result<Option<PersistedProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT start_time, duration_minutes
            FROM test_progress
            WHERE schedule_id = ?1
            ",
        )
        .bind(schedule_id_to_i64(schedule)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn put_progress(
        &self,
        schedule: ScheduleId,
        progress: &PersistedProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO test_progress (schedule_id, start_time, duration_minutes)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(schedule_id) DO UPDATE SET
                start_time = excluded.start_time,
                duration_minutes = excluded.duration_minutes
            ",
        )
        .bind(schedule_id_to_i64(schedule)?)
        .bind(progress.start_time)
        .bind(i64::from(progress.duration_minutes))
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        tracing::debug!(schedule_id = %schedule, "stored test progress");
        Ok(())
    }

    async fn remove_progress(&self, schedule: ScheduleId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM test_progress WHERE schedule_id = ?1")
            .bind(schedule_id_to_i64(schedule)?)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::debug!(schedule_id = %schedule, "cleared test progress");
        }
        Ok(removed)
    }
}
