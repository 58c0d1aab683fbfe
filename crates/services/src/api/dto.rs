//! Wire shapes of the recruitment API, one typed contract per endpoint.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use recruit_core::model::{
    AnswerEntry, DEFAULT_DURATION_MINUTES, GradedResponse, JobRef, OpenSchedule, Question,
    QuestionError, QuestionId, Schedule, ScheduleId, ScoreBreakdown, SelectedOption, StudentRef,
    TestResult, User, UserId,
};

pub const STATUS_SUCCESS: &str = "success";

/// Parse an RFC 3339 timestamp; one without an offset is read as UTC.
///
/// # Errors
///
/// Returns the RFC 3339 parse error when neither form matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Ok(at.with_timezone(&Utc)),
        Err(err) => raw
            .parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|_| err),
    }
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(raw.trim()).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// ─── Schedules & questions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleResponse {
    #[serde(deserialize_with = "timestamp")]
    pub test_time: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub application: Option<ApplicationDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationDto {
    #[serde(default)]
    pub job: Option<JobTitleDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobTitleDto {
    #[serde(default)]
    pub title: Option<String>,
}

impl ScheduleResponse {
    #[must_use]
    pub fn into_schedule(self, id: ScheduleId) -> Schedule {
        let job_title = self
            .application
            .and_then(|app| app.job)
            .and_then(|job| job.title)
            .filter(|title| !title.trim().is_empty());
        Schedule {
            id,
            test_time: self.test_time,
            duration_minutes: self
                .duration_minutes
                .filter(|minutes| *minutes > 0)
                .unwrap_or(DEFAULT_DURATION_MINUTES),
            job_title,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSetResponse {
    pub status: String,
    #[serde(default)]
    pub questions: Vec<QuestionDto>,
    #[serde(default)]
    pub job_title: Option<String>,
}

impl QuestionSetResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDto {
    pub id: QuestionId,
    pub question_text: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
}

impl TryFrom<QuestionDto> for Question {
    type Error = QuestionError;

    fn try_from(dto: QuestionDto) -> Result<Self, Self::Error> {
        Question::new(
            dto.id,
            dto.question_text,
            [dto.option1, dto.option2, dto.option3, dto.option4],
        )
    }
}

// ─── Submission ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRequest {
    pub student_email: String,
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<ScoreBreakdown>,
}

impl SubmissionResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

// ─── Dashboard & results ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveTestsResponse {
    pub status: String,
    #[serde(default)]
    pub schedules: Vec<ActiveScheduleDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveScheduleDto {
    pub id: ScheduleId,
    #[serde(deserialize_with = "timestamp")]
    pub test_time: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub job_title: Option<String>,
}

impl From<ActiveScheduleDto> for OpenSchedule {
    fn from(dto: ActiveScheduleDto) -> Self {
        Self {
            id: dto.id,
            job_title: dto.job_title.unwrap_or_else(|| "Test".into()),
            test_time: dto.test_time,
            duration_minutes: dto.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestResultResponse {
    pub status: String,
    #[serde(default)]
    pub test: Option<TestDetailsDto>,
    #[serde(default)]
    pub student: Option<StudentDto>,
    #[serde(default)]
    pub job: Option<JobDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestDetailsDto {
    pub id: ScheduleId,
    #[serde(deserialize_with = "timestamp")]
    pub test_time: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub responses: Vec<ResponseDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseDto {
    pub question_text: String,
    pub selected_option: SelectedOption,
    pub correct_option: SelectedOption,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentDto {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobDto {
    pub id: u64,
    pub title: String,
}

impl TestResultResponse {
    /// `None` when the server has no graded attempt for the schedule.
    #[must_use]
    pub fn into_result(self) -> Option<TestResult> {
        let test = self.test?;
        Some(TestResult {
            schedule_id: test.id,
            test_time: test.test_time,
            is_completed: test.is_completed,
            score: test.score,
            responses: test
                .responses
                .into_iter()
                .map(|r| GradedResponse {
                    question_text: r.question_text,
                    selected_option: r.selected_option,
                    correct_option: r.correct_option,
                    is_correct: r.is_correct,
                })
                .collect(),
            student: self.student.map(|s| StudentRef {
                id: s.id,
                name: s.name,
                email: s.email,
            }),
            job: self.job.map(|j| JobRef {
                id: j.id,
                title: j.title,
            }),
        })
    }
}

// ─── Auth ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
