use recruit_core::model::{Credentials, PersistedProgress, ScheduleId, User, UserId};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn schedule_id_to_i64(id: ScheduleId) -> Result<i64, StorageError> {
    id_to_i64("schedule_id", id.value())
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<PersistedProgress, StorageError> {
    let start_time: chrono::DateTime<chrono::Utc> = row.try_get("start_time").map_err(ser)?;
    let duration: i64 = row.try_get("duration_minutes").map_err(ser)?;
    let duration_minutes = u32::try_from(duration)
        .map_err(|_| StorageError::Serialization("duration_minutes out of range".into()))?;
    Ok(PersistedProgress::new(start_time, duration_minutes))
}

pub(crate) fn map_credentials_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Credentials, StorageError> {
    let user_id: i64 = row.try_get("user_id").map_err(ser)?;
    let user = User {
        id: UserId::new(i64_to_u64("user_id", user_id)?),
        email: row.try_get("email").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        is_staff: row.try_get::<i64, _>("is_staff").map_err(ser)? != 0,
    };
    Ok(Credentials {
        access_token: row.try_get("access_token").map_err(ser)?,
        refresh_token: row.try_get("refresh_token").map_err(ser)?,
        user,
    })
}
