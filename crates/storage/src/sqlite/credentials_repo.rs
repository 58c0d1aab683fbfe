use async_trait::async_trait;
use recruit_core::model::Credentials;

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_credentials_row};
use crate::repository::{CredentialRepository, StorageError};

#[async_trait]
impl CredentialRepository for SqliteRepository {
    async fn load_credentials(&self) -> Result<Option<Credentials>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT access_token, refresh_token, user_id, email, name, is_staff
            FROM credentials
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_credentials_row).transpose()
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let user = &credentials.user;
        sqlx::query(
            r"
            INSERT INTO credentials (
                id,
                access_token,
                refresh_token,
                user_id,
                email,
                name,
                is_staff
            )
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                user_id = excluded.user_id,
                email = excluded.email,
                name = excluded.name,
                is_staff = excluded.is_staff
            ",
        )
        .bind(&credentials.access_token)
        .bind(&credentials.refresh_token)
        .bind(id_to_i64("user_id", user.id.value())?)
        .bind(&user.email)
        .bind(user.name.as_deref())
        .bind(i64::from(user.is_staff))
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn update_tokens(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE credentials
            SET access_token = ?1, refresh_token = ?2
            WHERE id = 1
            ",
        )
        .bind(access)
        .bind(refresh)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn clear_credentials(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM credentials")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
