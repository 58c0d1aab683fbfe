use std::sync::Arc;

use tracing::{info, warn};

use recruit_core::model::{Credentials, User};
use storage::repository::CredentialRepository;

use crate::api::{AuthApi, LoginRequest, RefreshRequest};
use crate::error::{ApiError, AuthError};

//
// ─── TOKEN REFRESH ─────────────────────────────────────────────────────────────
//

/// Exchange the stored refresh token for a new access token and store the pair.
///
/// A rejected refresh clears the stored credentials, so the next call reports
/// `NotAuthenticated` instead of looping on a dead token.
///
/// # Errors
///
/// Returns `ApiError::NotAuthenticated` when nothing is stored and
/// `ApiError::SessionExpired` when the server refuses the refresh token.
pub async fn refresh_credentials(
    api: &dyn AuthApi,
    store: &dyn CredentialRepository,
) -> Result<String, ApiError> {
    let Some(credentials) = store.load_credentials().await? else {
        return Err(ApiError::NotAuthenticated);
    };
    let request = RefreshRequest {
        refresh: credentials.refresh_token.clone(),
    };
    match api.refresh(&request).await {
        Ok(response) => {
            let refresh = response.refresh.unwrap_or(credentials.refresh_token);
            store.update_tokens(&response.access, &refresh).await?;
            Ok(response.access)
        }
        Err(err) => {
            warn!(error = %err, "token refresh failed, clearing credentials");
            store.clear_credentials().await?;
            Err(ApiError::SessionExpired)
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Logs users in and out and keeps the credential store current.
#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn AuthApi>,
    credentials: Arc<dyn CredentialRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, credentials: Arc<dyn CredentialRepository>) -> Self {
        Self { api, credentials }
    }

    /// Authenticate and store the returned tokens and profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input,
    /// `AuthError::Rejected` on 400/401, and other failures as `Api`/`Storage`.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let request = LoginRequest {
            email: email.to_owned(),
            username: email.to_owned(),
            password: password.to_owned(),
        };
        let response = match self.api.login(&request).await {
            Ok(response) => response,
            Err(err) if matches!(err.status().map(|s| s.as_u16()), Some(400 | 401)) => {
                return Err(AuthError::Rejected);
            }
            Err(err) => return Err(err.into()),
        };
        let user = response.user.unwrap_or_else(|| User::placeholder(email));
        self.credentials
            .save_credentials(&Credentials {
                access_token: response.access,
                refresh_token: response.refresh,
                user: user.clone(),
            })
            .await?;
        info!(email = %user.email, "logged in");
        Ok(user)
    }

    /// Tell the server to revoke the refresh token, then forget everything local.
    ///
    /// Local credentials are cleared even when the server call fails.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the local credentials cannot be cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(credentials) = self.credentials.load_credentials().await? {
            let request = RefreshRequest {
                refresh: credentials.refresh_token,
            };
            if let Err(err) = self.api.logout(&request).await {
                warn!(error = %err, "server logout failed");
            }
        }
        self.credentials.clear_credentials().await?;
        info!("logged out");
        Ok(())
    }

    /// # Errors
    ///
    /// See [`refresh_credentials`].
    pub async fn refresh(&self) -> Result<String, AuthError> {
        Ok(refresh_credentials(self.api.as_ref(), self.credentials.as_ref()).await?)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` on backend failures.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        Ok(self
            .credentials
            .load_credentials()
            .await?
            .map(|c| c.user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LoginResponse, RefreshResponse};
    use async_trait::async_trait;
    use recruit_core::model::UserId;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use storage::repository::InMemoryRepository;

    #[derive(Default)]
    struct ScriptedAuth {
        reject_login: bool,
        reject_refresh: bool,
        fail_logout: bool,
        with_profile: bool,
        rotated_refresh: Option<String>,
        logouts: Mutex<Vec<String>>,
    }

    fn status(code: StatusCode) -> ApiError {
        ApiError::Status {
            status: code,
            message: None,
        }
    }

    #[async_trait]
    impl AuthApi for ScriptedAuth {
        async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
            if self.reject_login {
                return Err(status(StatusCode::UNAUTHORIZED));
            }
            Ok(LoginResponse {
                access: "access-1".into(),
                refresh: "refresh-1".into(),
                user: self.with_profile.then(|| User {
                    id: UserId::new(9),
                    email: request.email.clone(),
                    name: Some("Ada".into()),
                    is_staff: false,
                }),
            })
        }

        async fn refresh(&self, _request: &RefreshRequest) -> Result<RefreshResponse, ApiError> {
            if self.reject_refresh {
                return Err(status(StatusCode::UNAUTHORIZED));
            }
            Ok(RefreshResponse {
                access: "access-2".into(),
                refresh: self.rotated_refresh.clone(),
            })
        }

        async fn logout(&self, request: &RefreshRequest) -> Result<(), ApiError> {
            self.logouts.lock().unwrap().push(request.refresh.clone());
            if self.fail_logout {
                return Err(status(StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok(())
        }
    }

    fn service(api: ScriptedAuth) -> (AuthService, Arc<ScriptedAuth>, InMemoryRepository) {
        let api = Arc::new(api);
        let repo = InMemoryRepository::new();
        let service = AuthService::new(api.clone(), Arc::new(repo.clone()));
        (service, api, repo)
    }

    #[tokio::test]
    async fn login_stores_tokens_and_profile() {
        let (auth, _, repo) = service(ScriptedAuth {
            with_profile: true,
            ..ScriptedAuth::default()
        });
        let user = auth.login(" ada@example.com ", "pw").await.unwrap();
        assert_eq!(user.display_name(), "Ada");

        let stored = repo.load_credentials().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "access-1");
        assert_eq!(stored.user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn login_without_profile_keeps_placeholder() {
        let (auth, _, _) = service(ScriptedAuth::default());
        let user = auth.login("ada@example.com", "pw").await.unwrap();
        assert_eq!(user.id, UserId::new(0));
        assert_eq!(user.display_name(), "ada@example.com");
    }

    #[tokio::test]
    async fn blank_and_rejected_logins_store_nothing() {
        let (auth, _, repo) = service(ScriptedAuth {
            reject_login: true,
            ..ScriptedAuth::default()
        });
        assert!(matches!(
            auth.login("  ", "pw").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.login("ada@example.com", "bad").await,
            Err(AuthError::Rejected)
        ));
        assert!(repo.load_credentials().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_token_unless_rotated() {
        let (auth, _, repo) = service(ScriptedAuth::default());
        auth.login("ada@example.com", "pw").await.unwrap();
        assert_eq!(auth.refresh().await.unwrap(), "access-2");
        let stored = repo.load_credentials().await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, "refresh-1");

        let (auth, _, repo) = service(ScriptedAuth {
            rotated_refresh: Some("refresh-2".into()),
            ..ScriptedAuth::default()
        });
        auth.login("ada@example.com", "pw").await.unwrap();
        auth.refresh().await.unwrap();
        let stored = repo.load_credentials().await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn rejected_refresh_clears_credentials() {
        let (auth, _, repo) = service(ScriptedAuth {
            reject_refresh: true,
            ..ScriptedAuth::default()
        });
        auth.login("ada@example.com", "pw").await.unwrap();
        assert!(matches!(
            auth.refresh().await,
            Err(AuthError::Api(ApiError::SessionExpired))
        ));
        assert!(repo.load_credentials().await.unwrap().is_none());
        assert!(matches!(
            auth.refresh().await,
            Err(AuthError::Api(ApiError::NotAuthenticated))
        ));
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let (auth, api, repo) = service(ScriptedAuth {
            fail_logout: true,
            ..ScriptedAuth::default()
        });
        auth.login("ada@example.com", "pw").await.unwrap();
        auth.logout().await.unwrap();

        assert_eq!(api.logouts.lock().unwrap().as_slice(), ["refresh-1"]);
        assert!(auth.current_user().await.unwrap().is_none());
        assert!(repo.load_credentials().await.unwrap().is_none());
    }
}
