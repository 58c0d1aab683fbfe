use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use recruit_core::model::ScheduleId;
use storage::repository::CredentialRepository;

use super::dto::ErrorBody;
use super::{
    ActiveTestsResponse, AuthApi, LoginRequest, LoginResponse, QuestionSetResponse, RecruitApi,
    RefreshRequest, RefreshResponse, ScheduleResponse, SubmissionRequest, SubmissionResponse,
    TestResultResponse,
};
use crate::auth_service::refresh_credentials;
use crate::config::ApiConfig;
use crate::error::ApiError;

/// Obtains a fresh access token after the server answered 401.
#[async_trait]
pub(crate) trait TokenRefresher: Send + Sync {
    async fn refresh_access(&self) -> Result<String, ApiError>;
}

/// Send once; on 401 refresh the token and replay the request exactly once.
pub(crate) async fn call_with_refresh<T, F, Fut>(
    refresher: &dyn TokenRefresher,
    token: Option<String>,
    send: F,
) -> Result<T, ApiError>
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ApiError>> + Send,
{
    match send(token).await {
        Err(ApiError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED => {
            debug!("access token rejected, refreshing");
            let fresh = refresher.refresh_access().await?;
            send(Some(fresh)).await
        }
        other => other,
    }
}

async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            message: body.message,
        });
    }
    Ok(response.json::<T>().await?)
}

async fn expect_success(request: RequestBuilder) -> Result<(), ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            message: body.message,
        });
    }
    Ok(())
}

/// `reqwest`-backed client for the recruitment API.
#[derive(Clone)]
pub struct HttpRecruitApi {
    client: Client,
    config: ApiConfig,
    credentials: Arc<dyn CredentialRepository>,
    refresh_lock: Arc<Mutex<()>>,
}

impl HttpRecruitApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(
        config: ApiConfig,
        credentials: Arc<dyn CredentialRepository>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            credentials,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str, token: Option<String>) -> RequestBuilder {
        let url = self.config.url(path);
        debug!(%method, %url, "api request");
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn authorized<T, F, Fut>(&self, send: F) -> Result<T, ApiError>
    where
        F: Fn(Option<String>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let token = self
            .credentials
            .load_credentials()
            .await?
            .map(|c| c.access_token);
        call_with_refresh(self, token, send).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.authorized(|token| read_json(self.request(Method::GET, path, token)))
            .await
    }
}

#[async_trait]
impl TokenRefresher for HttpRecruitApi {
    async fn refresh_access(&self) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        refresh_credentials(self, self.credentials.as_ref()).await
    }
}

#[async_trait]
impl RecruitApi for HttpRecruitApi {
    async fn schedule(&self, id: ScheduleId) -> Result<ScheduleResponse, ApiError> {
        self.get_json(&format!("test-schedule/{id}/")).await
    }

    async fn questions(&self, id: ScheduleId) -> Result<QuestionSetResponse, ApiError> {
        self.get_json(&format!("getquestions/schedule/{id}/")).await
    }

    async fn submit_answers(
        &self,
        id: ScheduleId,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ApiError> {
        let path = format!("submitanswers/{id}/");
        self.authorized(|token| {
            read_json(self.request(Method::POST, &path, token).json(request))
        })
        .await
    }

    async fn active_tests(&self, email: &str) -> Result<ActiveTestsResponse, ApiError> {
        self.get_json(&format!("student/active-tests/{email}/"))
            .await
    }

    async fn test_result(&self, id: ScheduleId) -> Result<TestResultResponse, ApiError> {
        self.get_json(&format!("test/results/{id}/")).await
    }
}

#[async_trait]
impl AuthApi for HttpRecruitApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        read_json(self.request(Method::POST, "auth/login/", None).json(request)).await
    }

    async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, ApiError> {
        read_json(
            self.request(Method::POST, "auth/token/refresh/", None)
                .json(request),
        )
        .await
    }

    async fn logout(&self, request: &RefreshRequest) -> Result<(), ApiError> {
        expect_success(self.request(Method::POST, "auth/logout/", None).json(request)).await
    }
}
