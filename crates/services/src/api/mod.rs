//! Client side of the recruitment REST API.

use async_trait::async_trait;

use recruit_core::model::ScheduleId;

use crate::error::ApiError;

pub mod dto;
mod http;

pub use dto::{
    ActiveTestsResponse, LoginRequest, LoginResponse, QuestionSetResponse, RefreshRequest,
    RefreshResponse, ScheduleResponse, SubmissionRequest, SubmissionResponse, TestResultResponse,
};
pub use http::HttpRecruitApi;

/// Endpoints used while taking and reviewing a test. Calls carry the bearer token.
#[async_trait]
pub trait RecruitApi: Send + Sync {
    /// `GET test-schedule/{id}/`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures and non-2xx statuses.
    async fn schedule(&self, id: ScheduleId) -> Result<ScheduleResponse, ApiError>;

    /// `GET getquestions/schedule/{id}/`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures and non-2xx statuses.
    async fn questions(&self, id: ScheduleId) -> Result<QuestionSetResponse, ApiError>;

    /// `POST submitanswers/{id}/`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures and non-2xx statuses.
    async fn submit_answers(
        &self,
        id: ScheduleId,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ApiError>;

    /// `GET student/active-tests/{email}/`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures and non-2xx statuses.
    async fn active_tests(&self, email: &str) -> Result<ActiveTestsResponse, ApiError>;

    /// `GET test/results/{id}/`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures and non-2xx statuses.
    async fn test_result(&self, id: ScheduleId) -> Result<TestResultResponse, ApiError>;
}

/// Unauthenticated token endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::Status` when the server rejects the credentials.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Status` when the refresh token is no longer valid.
    async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the server could not be reached or refused.
    async fn logout(&self, request: &RefreshRequest) -> Result<(), ApiError>;
}
