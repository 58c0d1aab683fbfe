use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{info, warn};

use recruit_core::model::{
    Notice, ScoreBreakdown, SessionStateError, SubmissionDraft, SubmitReason,
};
use storage::repository::{CredentialRepository, ProgressRepository};

use super::{SharedSession, lock_session};
use crate::api::{RecruitApi, SubmissionRequest};
use crate::error::{ApiError, SessionError};

const NOT_AUTHENTICATED: &str = "User not authenticated";
const NOT_AUTHORIZED: &str = "You are not authorized to submit this test.";
const NOT_FOUND: &str = "Test schedule not found or already completed";
const BAD_REQUEST: &str = "Invalid request. Please check your answers and try again.";
const UNEXPECTED: &str = "An unexpected error occurred while submitting the test. Please try again.";
const SUBMISSION_FAILED: &str = "Submission failed";

/// How a call to [`SubmissionDispatcher::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { score: Option<ScoreBreakdown> },
    /// The attempt failed; the session is in `Error` and may be submitted again.
    Rejected { notice: Notice },
    /// Another submission is pending; nothing was sent.
    AlreadyInFlight,
    AlreadySubmitted,
}

/// User-facing notice for a failed submission request.
#[must_use]
pub fn submission_notice(err: &ApiError) -> Notice {
    let message = err.server_message().map(str::to_owned);
    match err.status() {
        Some(StatusCode::FORBIDDEN) => match message {
            Some(message) => Notice::info(message),
            None => Notice::error(NOT_AUTHORIZED),
        },
        Some(StatusCode::NOT_FOUND) => Notice::error(NOT_FOUND),
        Some(StatusCode::BAD_REQUEST) => Notice::error(message.unwrap_or_else(|| BAD_REQUEST.into())),
        Some(_) => Notice::error(UNEXPECTED),
        None => match err {
            ApiError::NotAuthenticated => Notice::error(NOT_AUTHENTICATED),
            ApiError::SessionExpired => Notice::error(err.to_string()),
            _ => Notice::error(UNEXPECTED),
        },
    }
}

/// Sends the answer sheet at most once at a time.
///
/// Clones share the session, so concurrent callers race on the same
/// `Submitting` check.
#[derive(Clone)]
pub struct SubmissionDispatcher {
    state: SharedSession,
    api: Arc<dyn RecruitApi>,
    progress: Arc<dyn ProgressRepository>,
    credentials: Arc<dyn CredentialRepository>,
}

impl SubmissionDispatcher {
    #[must_use]
    pub fn new(
        state: SharedSession,
        api: Arc<dyn RecruitApi>,
        progress: Arc<dyn ProgressRepository>,
        credentials: Arc<dyn CredentialRepository>,
    ) -> Self {
        Self {
            state,
            api,
            progress,
            credentials,
        }
    }

    /// Submit the current answers.
    ///
    /// A call made while another is pending returns `AlreadyInFlight` without
    /// touching the network. Failures leave the session in `Error`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` while the session is still loading and
    /// `SessionError::Poisoned` if the session lock is poisoned.
    pub async fn submit(&self, reason: SubmitReason) -> Result<SubmitOutcome, SessionError> {
        let draft = {
            let mut session = lock_session(&self.state)?;
            match session.begin_submission(reason) {
                Ok(draft) => draft,
                Err(SessionStateError::SubmissionInFlight) => {
                    return Ok(SubmitOutcome::AlreadyInFlight);
                }
                Err(SessionStateError::AlreadySubmitted) => {
                    return Ok(SubmitOutcome::AlreadySubmitted);
                }
                Err(err) => return Err(err.into()),
            }
        };

        info!(
            schedule_id = %draft.schedule_id,
            reason = reason.annotation(),
            answers = draft.answers.len(),
            "submitting answers"
        );

        match self.send(&draft).await {
            Ok(score) => {
                lock_session(&self.state)?.complete_submission(score)?;
                if let Err(err) = self.progress.remove_progress(draft.schedule_id).await {
                    warn!(schedule_id = %draft.schedule_id, error = %err, "failed to clear progress after submission");
                }
                info!(schedule_id = %draft.schedule_id, "test submitted");
                Ok(SubmitOutcome::Submitted { score })
            }
            Err(notice) => {
                warn!(schedule_id = %draft.schedule_id, message = %notice.message, "submission failed");
                lock_session(&self.state)?.fail_submission(notice.clone())?;
                Ok(SubmitOutcome::Rejected { notice })
            }
        }
    }

    async fn send(&self, draft: &SubmissionDraft) -> Result<Option<ScoreBreakdown>, Notice> {
        let user = match self.credentials.load_credentials().await {
            Ok(Some(credentials)) => credentials.user,
            Ok(None) => return Err(Notice::error(NOT_AUTHENTICATED)),
            Err(err) => return Err(Notice::error(err.to_string())),
        };
        let request = SubmissionRequest {
            student_email: user.normalized_email(),
            answers: draft.answers.clone(),
        };
        match self.api.submit_answers(draft.schedule_id, &request).await {
            Ok(response) if response.is_success() => Ok(response.result),
            Ok(response) => Err(Notice::error(
                response
                    .message
                    .unwrap_or_else(|| SUBMISSION_FAILED.into()),
            )),
            Err(err) => Err(submission_notice(&err)),
        }
    }
}
