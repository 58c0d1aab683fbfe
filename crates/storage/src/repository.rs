use async_trait::async_trait;
use recruit_core::model::{Credentials, PersistedProgress, ScheduleId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value store of in-progress attempts, one record per schedule.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for a schedule, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        schedule: ScheduleId,
    ) -> Result<Option<PersistedProgress>, StorageError>;

    /// Insert or replace the record for a schedule.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn put_progress(
        &self,
        schedule: ScheduleId,
        progress: &PersistedProgress,
    ) -> Result<(), StorageError>;

    /// Delete the record for a schedule. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn remove_progress(&self, schedule: ScheduleId) -> Result<bool, StorageError>;
}

/// Single-slot store for the logged-in user's tokens and profile.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_credentials(&self) -> Result<Option<Credentials>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the credentials cannot be stored.
    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StorageError>;

    /// Replace just the token pair, keeping the cached profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when nobody is logged in.
    async fn update_tokens(&self, access: &str, refresh: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_credentials(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<ScheduleId, PersistedProgress>>>,
    credentials: Arc<Mutex<Option<Credentials>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored progress records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn progress_len(&self) -> Result<usize, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        schedule: ScheduleId,
    ) -> Result<Option<PersistedProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&schedule).copied())
    }

    async fn put_progress(
        &self,
        schedule: ScheduleId,
        progress: &PersistedProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(schedule, *progress);
        Ok(())
    }

    async fn remove_progress(&self, schedule: ScheduleId) -> Result<bool, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(&schedule).is_some())
    }
}

#[async_trait]
impl CredentialRepository for InMemoryRepository {
    async fn load_credentials(&self) -> Result<Option<Credentials>, StorageError> {
        let guard = self
            .credentials
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    async fn update_tokens(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let current = guard.as_mut().ok_or(StorageError::NotFound)?;
        access.clone_into(&mut current.access_token);
        refresh.clone_into(&mut current.refresh_token);
        Ok(())
    }

    async fn clear_credentials(&self) -> Result<(), StorageError> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let credentials: Arc<dyn CredentialRepository> = Arc::new(repo);
        Self {
            progress,
            credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recruit_core::model::User;
    use recruit_core::time::fixed_now;

    fn creds() -> Credentials {
        Credentials {
            access_token: "a1".into(),
            refresh_token: "r1".into(),
            user: User::placeholder("student@campus.edu"),
        }
    }

    #[tokio::test]
    async fn progress_is_one_record_per_schedule() {
        let repo = InMemoryRepository::new();
        let id = ScheduleId::new(42);
        let first = PersistedProgress::new(fixed_now(), 60);
        let second = PersistedProgress::new(fixed_now() + chrono::Duration::minutes(1), 45);

        repo.put_progress(id, &first).await.unwrap();
        repo.put_progress(id, &second).await.unwrap();

        assert_eq!(repo.progress_len().unwrap(), 1);
        assert_eq!(repo.get_progress(id).await.unwrap(), Some(second));
        assert!(repo.remove_progress(id).await.unwrap());
        assert!(!repo.remove_progress(id).await.unwrap());
        assert_eq!(repo.get_progress(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn token_update_requires_login() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.update_tokens("a", "r").await,
            Err(StorageError::NotFound)
        ));

        repo.save_credentials(&creds()).await.unwrap();
        repo.update_tokens("a2", "r2").await.unwrap();
        let stored = repo.load_credentials().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "a2");
        assert_eq!(stored.refresh_token, "r2");
        assert_eq!(stored.user.email, "student@campus.edu");

        repo.clear_credentials().await.unwrap();
        assert!(repo.load_credentials().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clearing_credentials_keeps_progress() {
        let storage = Storage::in_memory();
        let id = ScheduleId::new(7);
        storage
            .progress
            .put_progress(id, &PersistedProgress::new(fixed_now(), 30))
            .await
            .unwrap();
        storage.credentials.save_credentials(&creds()).await.unwrap();

        storage.credentials.clear_credentials().await.unwrap();

        assert!(storage.progress.get_progress(id).await.unwrap().is_some());
    }
}
