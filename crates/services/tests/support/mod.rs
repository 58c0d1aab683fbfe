#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tokio::sync::Notify;

use recruit_core::model::{
    Credentials, PersistedProgress, QuestionId, ScheduleId, ScoreBreakdown, User, UserId,
};
use services::api::dto::{ApplicationDto, JobTitleDto, QuestionDto};
use services::api::{
    ActiveTestsResponse, QuestionSetResponse, RecruitApi, ScheduleResponse, SubmissionRequest,
    SubmissionResponse, TestResultResponse,
};
use services::ApiError;
use storage::repository::{
    CredentialRepository, InMemoryRepository, ProgressRepository, StorageError,
};

#[derive(Debug, Clone)]
pub struct Failure {
    pub status: StatusCode,
    pub message: Option<String>,
}

impl Failure {
    pub fn new(status: StatusCode, message: Option<&str>) -> Self {
        Self {
            status,
            message: message.map(str::to_owned),
        }
    }

    fn to_error(&self) -> ApiError {
        ApiError::Status {
            status: self.status,
            message: self.message.clone(),
        }
    }
}

/// Scripted recruitment API that records what it was sent.
pub struct FakeApi {
    test_time: DateTime<Utc>,
    duration_minutes: u32,
    question_count: u64,
    questions_failure: Mutex<Option<Failure>>,
    submit_failure: Mutex<Option<Failure>>,
    submit_gate: Option<Arc<Notify>>,
    questions_delay: Option<Duration>,
    blank_option: Option<u64>,
    blank_text: Option<u64>,
    pub schedule_calls: AtomicUsize,
    pub question_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub submissions: Mutex<Vec<SubmissionRequest>>,
}

impl FakeApi {
    pub fn new(test_time: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            test_time,
            duration_minutes,
            question_count: 10,
            questions_failure: Mutex::new(None),
            submit_failure: Mutex::new(None),
            submit_gate: None,
            questions_delay: None,
            blank_option: None,
            blank_text: None,
            schedule_calls: AtomicUsize::new(0),
            question_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_questions(mut self, count: u64) -> Self {
        self.question_count = count;
        self
    }

    pub fn with_submit_gate(mut self, gate: Arc<Notify>) -> Self {
        self.submit_gate = Some(gate);
        self
    }

    /// The question endpoint answers only after `delay` of real time.
    pub fn with_questions_delay(mut self, delay: Duration) -> Self {
        self.questions_delay = Some(delay);
        self
    }

    /// Question `id` is sent with an empty fourth option.
    pub fn with_blank_option(mut self, id: u64) -> Self {
        self.blank_option = Some(id);
        self
    }

    /// Question `id` is sent with no question text.
    pub fn with_blank_text(mut self, id: u64) -> Self {
        self.blank_text = Some(id);
        self
    }

    pub fn fail_questions(&self, failure: Option<Failure>) {
        *self.questions_failure.lock().unwrap() = failure;
    }

    pub fn fail_submissions(&self, failure: Option<Failure>) {
        *self.submit_failure.lock().unwrap() = failure;
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn last_submission(&self) -> Option<SubmissionRequest> {
        self.submissions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RecruitApi for FakeApi {
    async fn schedule(&self, _id: ScheduleId) -> Result<ScheduleResponse, ApiError> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScheduleResponse {
            test_time: self.test_time,
            duration_minutes: Some(self.duration_minutes),
            application: Some(ApplicationDto {
                job: Some(JobTitleDto {
                    title: Some("Backend Engineer".into()),
                }),
            }),
        })
    }

    async fn questions(&self, _id: ScheduleId) -> Result<QuestionSetResponse, ApiError> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.questions_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.questions_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        let questions = (1..=self.question_count)
            .map(|id| QuestionDto {
                id: QuestionId::new(id),
                question_text: if self.blank_text == Some(id) {
                    "  ".into()
                } else {
                    format!("Question {id}")
                },
                option1: "alpha".into(),
                option2: "beta".into(),
                option3: "gamma".into(),
                option4: if self.blank_option == Some(id) {
                    String::new()
                } else {
                    "delta".into()
                },
            })
            .collect();
        Ok(QuestionSetResponse {
            status: "success".into(),
            questions,
            job_title: None,
        })
    }

    async fn submit_answers(
        &self,
        _id: ScheduleId,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.submit_gate {
            gate.notified().await;
        }
        let failure = self.submit_failure.lock().unwrap().clone();
        if let Some(failure) = failure {
            return Err(failure.to_error());
        }
        let answered = u32::try_from(
            request
                .answers
                .iter()
                .filter(|a| a.selected_option.is_answered())
                .count(),
        )
        .unwrap();
        Ok(SubmissionResponse {
            status: "success".into(),
            message: None,
            result: Some(ScoreBreakdown {
                score: answered * 10,
                total_questions: 10,
                correct_answers: answered,
                wrong_answers: 0,
            }),
        })
    }

    async fn active_tests(&self, _email: &str) -> Result<ActiveTestsResponse, ApiError> {
        Err(Failure::new(StatusCode::NOT_FOUND, None).to_error())
    }

    async fn test_result(&self, _id: ScheduleId) -> Result<TestResultResponse, ApiError> {
        Err(Failure::new(StatusCode::NOT_FOUND, None).to_error())
    }
}

/// Progress store that counts writes.
#[derive(Clone, Default)]
pub struct CountingProgress {
    pub inner: InMemoryRepository,
    puts: Arc<AtomicUsize>,
}

impl CountingProgress {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressRepository for CountingProgress {
    async fn get_progress(
        &self,
        schedule: ScheduleId,
    ) -> Result<Option<PersistedProgress>, StorageError> {
        self.inner.get_progress(schedule).await
    }

    async fn put_progress(
        &self,
        schedule: ScheduleId,
        progress: &PersistedProgress,
    ) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_progress(schedule, progress).await
    }

    async fn remove_progress(&self, schedule: ScheduleId) -> Result<bool, StorageError> {
        self.inner.remove_progress(schedule).await
    }
}

pub async fn logged_in(repo: &InMemoryRepository) {
    repo.save_credentials(&Credentials {
        access_token: "access".into(),
        refresh_token: "refresh".into(),
        user: User {
            id: UserId::new(5),
            email: "  Student@Example.COM ".into(),
            name: Some("Student".into()),
            is_staff: false,
        },
    })
    .await
    .unwrap();
}
