#![forbid(unsafe_code)]

//! Remote API client, authentication and the proctored test session runtime.

pub mod api;
pub mod auth_service;
pub mod config;
pub mod error;
pub mod sessions;

pub use recruit_core::Clock;

pub use api::{AuthApi, HttpRecruitApi, RecruitApi};
pub use auth_service::AuthService;
pub use config::ApiConfig;
pub use error::{ApiError, AuthError, SessionError};
pub use sessions::{
    ActiveTest, EventBus, EventSource, GuardHandle, Resolution, SubmissionDispatcher,
    SubmitOutcome, TestSessionService,
};
