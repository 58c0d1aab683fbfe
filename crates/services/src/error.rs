//! Shared error types for the services crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use recruit_core::model::{ScheduleId, SessionStateError};
use storage::repository::StorageError;

/// Errors emitted by the REST client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request failed with status {status}")]
    Status {
        status: reqwest::StatusCode,
        message: Option<String>,
    },
    #[error("not logged in")]
    NotAuthenticated,
    #[error("session expired, please log in again")]
    SessionExpired,
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `message` field of the server's error body, when it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email or password")]
    Rejected,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while resolving, running or inspecting a test session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid test schedule id {0}")]
    InvalidSchedule(ScheduleId),
    #[error("failed to load test schedule")]
    ScheduleUnavailable(#[source] ApiError),
    #[error("the test window has ended on {ended_at}")]
    WindowClosed { ended_at: DateTime<Utc> },
    #[error("{message}")]
    NotYetOpen { message: String },
    #[error("test schedule not found or already completed")]
    ScheduleNotFound,
    #[error("{message}")]
    QuestionsUnavailable {
        message: String,
        #[source]
        source: ApiError,
    },
    #[error("no questions available")]
    NoQuestions,
    #[error("user not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("session state lock poisoned")]
    Poisoned,
}

impl SessionError {
    /// Informational conditions tell the user to wait rather than report a failure.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::NotYetOpen { .. })
    }
}
