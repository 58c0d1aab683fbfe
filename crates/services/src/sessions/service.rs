use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};

use recruit_core::model::{OpenSchedule, Question, ScheduleId, TestResult};
use recruit_core::time::Clock;
use storage::repository::{CredentialRepository, ProgressRepository};

use super::active::ActiveTest;
use super::countdown::CountdownDriver;
use super::dispatcher::SubmissionDispatcher;
use super::guard::{EventSource, ProctorGuard};
use super::resolver::SessionResolver;
use super::SharedSession;
use crate::api::RecruitApi;
use crate::error::SessionError;

/// Title shown when neither the schedule nor the question set names the job.
pub const DEFAULT_JOB_TITLE: &str = "Test";

const NOT_STARTED: &str = "Your test is not started yet. Please try at the scheduled time.";
const QUESTIONS_FAILED: &str = "Failed to load questions. Please try again.";

/// Entry point for everything a student does with scheduled tests.
#[derive(Clone)]
pub struct TestSessionService {
    clock: Clock,
    api: Arc<dyn RecruitApi>,
    progress: Arc<dyn ProgressRepository>,
    credentials: Arc<dyn CredentialRepository>,
}

impl TestSessionService {
    #[must_use]
    pub fn new(
        api: Arc<dyn RecruitApi>,
        progress: Arc<dyn ProgressRepository>,
        credentials: Arc<dyn CredentialRepository>,
    ) -> Self {
        Self {
            clock: Clock::default(),
            api,
            progress,
            credentials,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve the schedule, load its questions and start monitoring.
    ///
    /// The countdown and guard are running when this returns. Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Resolver errors (see [`SessionResolver::resolve`]), plus `NotYetOpen`
    /// for a 403 on the question set, `ScheduleNotFound` for a 404,
    /// `QuestionsUnavailable` for other failures and `NoQuestions` for an
    /// empty or unsuccessful set.
    ///
    /// The remaining time is taken after the questions arrive, so a slow
    /// question fetch shortens the attempt instead of extending it.
    pub async fn open(
        &self,
        id: ScheduleId,
        events: Arc<dyn EventSource>,
    ) -> Result<ActiveTest, SessionError> {
        let resolver = SessionResolver::new(self.clock, self.api.clone(), self.progress.clone());
        let resolved = resolver.resolve(id).await?;
        let (questions, job_title) = self.load_questions(id).await?;

        let mut session = resolved.session;
        if let Some(title) = job_title {
            session.set_job_title(title);
        }
        session.resync(self.clock.now());
        session.activate(questions)?;
        info!(
            schedule_id = %id,
            questions = session.questions().len(),
            remaining = session.remaining_seconds(),
            "test started"
        );

        let state: SharedSession = Arc::new(std::sync::Mutex::new(session));
        let (tx, rx) = unbounded_channel();
        let guard = ProctorGuard::attach(events, state.clone(), tx.clone());
        let countdown = CountdownDriver::spawn(state.clone(), tx);
        let dispatcher = SubmissionDispatcher::new(
            state.clone(),
            self.api.clone(),
            self.progress.clone(),
            self.credentials.clone(),
        );
        Ok(ActiveTest::new(
            state,
            resolved.resolution,
            dispatcher,
            self.progress.clone(),
            self.clock,
            rx,
            countdown,
            guard,
        ))
    }

    async fn load_questions(
        &self,
        id: ScheduleId,
    ) -> Result<(Vec<Question>, Option<String>), SessionError> {
        let response = match self.api.questions(id).await {
            Ok(response) => response,
            Err(err) => {
                return Err(match err.status() {
                    Some(StatusCode::FORBIDDEN) => SessionError::NotYetOpen {
                        message: err.server_message().unwrap_or(NOT_STARTED).to_owned(),
                    },
                    Some(StatusCode::NOT_FOUND) => SessionError::ScheduleNotFound,
                    _ => SessionError::QuestionsUnavailable {
                        message: QUESTIONS_FAILED.to_owned(),
                        source: err,
                    },
                });
            }
        };
        if !response.is_success() || response.questions.is_empty() {
            debug!(schedule_id = %id, status = %response.status, "question set unusable");
            return Err(SessionError::NoQuestions);
        }
        let job_title = response
            .job_title
            .filter(|title| !title.trim().is_empty());
        let questions: Vec<Question> = response
            .questions
            .into_iter()
            .filter_map(|dto| match Question::try_from(dto) {
                Ok(question) => Some(question),
                Err(err) => {
                    warn!(schedule_id = %id, error = %err, "skipping malformed question");
                    None
                }
            })
            .collect();
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        Ok((questions, job_title))
    }

    /// Schedules currently open for the logged-in student.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAuthenticated` with nobody logged in, and
    /// `SessionError::Api` for failures other than 404.
    pub async fn active_tests(&self) -> Result<Vec<OpenSchedule>, SessionError> {
        let Some(credentials) = self.credentials.load_credentials().await? else {
            return Err(SessionError::NotAuthenticated);
        };
        let email = credentials.user.normalized_email();
        let response = match self.api.active_tests(&email).await {
            Ok(response) => response,
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if response.status != crate::api::dto::STATUS_SUCCESS {
            debug!(status = %response.status, "no active tests reported");
            return Ok(Vec::new());
        }
        Ok(response.schedules.into_iter().map(OpenSchedule::from).collect())
    }

    /// Graded result of a finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` for id 0, `ScheduleNotFound` when the server
    /// has no graded attempt, and `Api` for other failures.
    pub async fn result(&self, id: ScheduleId) -> Result<TestResult, SessionError> {
        if !id.is_valid() {
            return Err(SessionError::InvalidSchedule(id));
        }
        let response = match self.api.test_result(id).await {
            Ok(response) => response,
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                return Err(SessionError::ScheduleNotFound);
            }
            Err(err) => return Err(err.into()),
        };
        response.into_result().ok_or(SessionError::ScheduleNotFound)
    }
}
