use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::countdown::{Countdown, TickOutcome};
use crate::model::{
    AnswerEntry, AnswerSheet, QUESTION_LIMIT, Question, QuestionId, ScheduleId, ScoreBreakdown,
    SelectedOption, TestWindow,
};

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Active,
    Submitting,
    Submitted,
    /// The last submission attempt failed; a manual retry is still accepted.
    Error,
}

/// Why a submission was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubmitReason {
    Manual,
    TimeExpired,
    RuleViolation,
    LeftFullscreen,
}

impl SubmitReason {
    #[must_use]
    pub fn annotation(self) -> &'static str {
        match self {
            Self::Manual => "submitted",
            Self::TimeExpired => "auto-submit: time expired",
            Self::RuleViolation => "terminated: rule violation",
            Self::LeftFullscreen => "submitted: left fullscreen",
        }
    }

    #[must_use]
    pub fn is_automatic(self) -> bool {
        !matches!(self, Self::Manual)
    }

    /// Message shown while the submission is in flight.
    #[must_use]
    pub fn notice(self) -> Option<Notice> {
        let message = match self {
            Self::Manual => return None,
            Self::TimeExpired => "Time's up! Submitting your test...",
            Self::RuleViolation => "Test terminated due to violation of test rules.",
            Self::LeftFullscreen => "Test submitted due to exiting fullscreen mode.",
        };
        Some(Notice::info(message))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// User-facing message attached to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("no questions available")]
    NoQuestions,

    #[error("session is not accepting answers while {status:?}")]
    NotAcceptingAnswers { status: SessionStatus },

    #[error("unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("session has not started")]
    NotStarted,

    #[error("session was already activated and is {status:?}")]
    AlreadyActivated { status: SessionStatus },

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("session already submitted")]
    AlreadySubmitted,

    #[error("no submission in flight")]
    NotSubmitting,
}

/// Snapshot of what a submission needs, taken when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub schedule_id: ScheduleId,
    pub reason: SubmitReason,
    pub answers: Vec<AnswerEntry>,
}

/// State of one timed attempt: window, countdown, questions, answers and
/// submission status.
///
/// Pure state; timers, listeners and I/O live in the services layer and drive
/// it through `tick`, `select` and the `*_submission` transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSession {
    schedule_id: ScheduleId,
    job_title: String,
    window: TestWindow,
    countdown: Countdown,
    status: SessionStatus,
    questions: Vec<Question>,
    answers: AnswerSheet,
    last_reason: Option<SubmitReason>,
    notice: Option<Notice>,
    score: Option<ScoreBreakdown>,
}

impl TestSession {
    /// A session waiting for its questions.
    #[must_use]
    pub fn loading(
        schedule_id: ScheduleId,
        window: TestWindow,
        remaining_seconds: u64,
        job_title: impl Into<String>,
    ) -> Self {
        Self {
            schedule_id,
            job_title: job_title.into(),
            window,
            countdown: Countdown::new(remaining_seconds),
            status: SessionStatus::Loading,
            questions: Vec::new(),
            answers: AnswerSheet::new(),
            last_reason: None,
            notice: None,
            score: None,
        }
    }

    /// Install the question set and start accepting answers.
    ///
    /// Keeps at most `QUESTION_LIMIT` questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NoQuestions` for an empty set and
    /// `SessionStateError::AlreadyActivated` if the session is past loading.
    pub fn activate(&mut self, mut questions: Vec<Question>) -> Result<(), SessionStateError> {
        if self.status != SessionStatus::Loading {
            return Err(SessionStateError::AlreadyActivated {
                status: self.status,
            });
        }
        questions.truncate(QUESTION_LIMIT);
        if questions.is_empty() {
            return Err(SessionStateError::NoQuestions);
        }
        self.questions = questions;
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Re-derive the remaining time from the window at `now`.
    ///
    /// Only a loading session is affected, so time spent fetching questions
    /// is charged to the attempt.
    pub fn resync(&mut self, now: DateTime<Utc>) {
        if self.status == SessionStatus::Loading {
            self.countdown = Countdown::new(self.window.remaining_seconds_at(now));
        }
    }

    pub fn set_job_title(&mut self, title: impl Into<String>) {
        self.job_title = title.into();
    }

    pub fn set_notice(&mut self, notice: Option<Notice>) {
        self.notice = notice;
    }

    #[must_use]
    pub fn schedule_id(&self) -> ScheduleId {
        self.schedule_id
    }

    #[must_use]
    pub fn job_title(&self) -> &str {
        &self.job_title
    }

    #[must_use]
    pub fn window(&self) -> TestWindow {
        self.window
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.window.start()
    }

    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.window.end()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        self.countdown.remaining_seconds()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn last_reason(&self) -> Option<SubmitReason> {
        self.last_reason
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> Option<&ScoreBreakdown> {
        self.score.as_ref()
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == SessionStatus::Submitted
    }

    /// Whether the countdown is still live.
    #[must_use]
    pub fn is_counting_down(&self) -> bool {
        self.status == SessionStatus::Active && self.countdown.is_running()
    }

    /// Record a selection for a question of this session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NotAcceptingAnswers` outside `Active`/`Error`
    /// and `SessionStateError::UnknownQuestion` for ids not in the set.
    pub fn select(
        &mut self,
        question: QuestionId,
        option: SelectedOption,
    ) -> Result<(), SessionStateError> {
        if !matches!(self.status, SessionStatus::Active | SessionStatus::Error) {
            return Err(SessionStateError::NotAcceptingAnswers {
                status: self.status,
            });
        }
        if !self.questions.iter().any(|q| q.id() == question) {
            return Err(SessionStateError::UnknownQuestion(question));
        }
        self.answers.select(question, option);
        Ok(())
    }

    /// Advance the countdown by one second. Only counts while `Active`.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Active {
            self.countdown.cancel();
            return TickOutcome::Stopped;
        }
        self.countdown.tick()
    }

    /// Move to `Submitting` and capture the payload.
    ///
    /// The countdown is cancelled here whatever the outcome of the request.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionInFlight` while `Submitting`, `AlreadySubmitted` once
    /// `Submitted`, and `NotStarted` while `Loading`.
    pub fn begin_submission(
        &mut self,
        reason: SubmitReason,
    ) -> Result<SubmissionDraft, SessionStateError> {
        match self.status {
            SessionStatus::Active | SessionStatus::Error => {}
            SessionStatus::Submitting => return Err(SessionStateError::SubmissionInFlight),
            SessionStatus::Submitted => return Err(SessionStateError::AlreadySubmitted),
            SessionStatus::Loading => return Err(SessionStateError::NotStarted),
        }
        self.countdown.cancel();
        self.status = SessionStatus::Submitting;
        self.last_reason = Some(reason);
        self.notice = reason.notice();
        Ok(SubmissionDraft {
            schedule_id: self.schedule_id,
            reason,
            answers: self.answers.entries(&self.questions),
        })
    }

    /// # Errors
    ///
    /// Returns `SessionStateError::NotSubmitting` unless a submission is in flight.
    pub fn complete_submission(
        &mut self,
        score: Option<ScoreBreakdown>,
    ) -> Result<(), SessionStateError> {
        if self.status != SessionStatus::Submitting {
            return Err(SessionStateError::NotSubmitting);
        }
        self.status = SessionStatus::Submitted;
        self.score = score;
        self.notice = None;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionStateError::NotSubmitting` unless a submission is in flight.
    pub fn fail_submission(&mut self, notice: Notice) -> Result<(), SessionStateError> {
        if self.status != SessionStatus::Submitting {
            return Err(SessionStateError::NotSubmitting);
        }
        self.status = SessionStatus::Error;
        self.notice = Some(notice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn questions(n: u64) -> Vec<Question> {
        (1..=n)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Question {id}"),
                    ["a".into(), "b".into(), "c".into(), "d".into()],
                )
                .unwrap()
            })
            .collect()
    }

    fn active(remaining: u64, n: u64) -> TestSession {
        let mut session = TestSession::loading(
            ScheduleId::new(42),
            TestWindow::new(fixed_now(), 60),
            remaining,
            "Backend Engineer",
        );
        session.activate(questions(n)).unwrap();
        session
    }

    fn opt(v: u8) -> SelectedOption {
        SelectedOption::new(v).unwrap()
    }

    #[test]
    fn activation_truncates_to_limit() {
        let session = active(60, 14);
        assert_eq!(session.questions().len(), QUESTION_LIMIT);
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn resync_charges_time_spent_loading() {
        let start = fixed_now();
        let mut session =
            TestSession::loading(ScheduleId::new(1), TestWindow::new(start, 60), 3_600, "x");
        session.resync(start + chrono::Duration::seconds(20));
        assert_eq!(session.remaining_seconds(), 3_580);

        session.activate(questions(2)).unwrap();
        session.resync(start + chrono::Duration::seconds(50));
        assert_eq!(session.remaining_seconds(), 3_580);
    }

    #[test]
    fn resync_past_the_end_expires_on_first_tick() {
        let start = fixed_now();
        let mut session =
            TestSession::loading(ScheduleId::new(1), TestWindow::new(start, 1), 60, "x");
        session.resync(start + chrono::Duration::seconds(90));
        session.activate(questions(1)).unwrap();
        assert_eq!(session.remaining_seconds(), 0);
        assert_eq!(session.tick(), TickOutcome::Expired);
    }

    #[test]
    fn second_activation_reports_current_status() {
        let mut session = active(60, 3);
        assert_eq!(
            session.activate(questions(3)),
            Err(SessionStateError::AlreadyActivated {
                status: SessionStatus::Active
            })
        );
    }

    #[test]
    fn empty_question_set_cannot_activate() {
        let mut session =
            TestSession::loading(ScheduleId::new(1), TestWindow::new(fixed_now(), 5), 300, "x");
        assert_eq!(
            session.activate(Vec::new()),
            Err(SessionStateError::NoQuestions)
        );
        assert_eq!(session.status(), SessionStatus::Loading);
    }

    #[test]
    fn loading_session_rejects_answers_and_ticks() {
        let mut session =
            TestSession::loading(ScheduleId::new(1), TestWindow::new(fixed_now(), 5), 300, "x");
        assert!(matches!(
            session.select(QuestionId::new(1), opt(1)),
            Err(SessionStateError::NotAcceptingAnswers { .. })
        ));
        assert_eq!(session.tick(), TickOutcome::Stopped);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut session = active(60, 2);
        assert_eq!(
            session.select(QuestionId::new(99), opt(1)),
            Err(SessionStateError::UnknownQuestion(QuestionId::new(99)))
        );
    }

    #[test]
    fn three_of_ten_answered_yields_ten_entries() {
        let mut session = active(60, 10);
        session.select(QuestionId::new(1), opt(2)).unwrap();
        session.select(QuestionId::new(4), opt(1)).unwrap();
        session.select(QuestionId::new(9), opt(4)).unwrap();

        let draft = session.begin_submission(SubmitReason::TimeExpired).unwrap();
        assert_eq!(draft.answers.len(), 10);
        let unanswered = draft
            .answers
            .iter()
            .filter(|e| e.selected_option == SelectedOption::NONE)
            .count();
        assert_eq!(unanswered, 7);
    }

    #[test]
    fn second_begin_while_submitting_is_rejected() {
        let mut session = active(60, 1);
        session.begin_submission(SubmitReason::Manual).unwrap();
        assert_eq!(
            session.begin_submission(SubmitReason::Manual),
            Err(SessionStateError::SubmissionInFlight)
        );
    }

    #[test]
    fn submission_stops_the_countdown_for_good() {
        let mut session = active(60, 1);
        session.begin_submission(SubmitReason::Manual).unwrap();
        session
            .fail_submission(Notice::error("network down"))
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.tick(), TickOutcome::Stopped);
        assert!(!session.is_counting_down());
        assert_eq!(session.remaining_seconds(), 60);
    }

    #[test]
    fn failed_submission_can_be_retried_and_completed() {
        let mut session = active(60, 1);
        session.begin_submission(SubmitReason::Manual).unwrap();
        session.fail_submission(Notice::error("bad request")).unwrap();
        session.select(QuestionId::new(1), opt(3)).unwrap();

        let retry = session.begin_submission(SubmitReason::Manual).unwrap();
        assert_eq!(retry.answers[0].selected_option, opt(3));
        let score = ScoreBreakdown {
            score: 1,
            total_questions: 1,
            correct_answers: 1,
            wrong_answers: 0,
        };
        session.complete_submission(Some(score)).unwrap();
        assert!(session.is_submitted());
        assert_eq!(session.score(), Some(&score));
        assert_eq!(
            session.begin_submission(SubmitReason::Manual),
            Err(SessionStateError::AlreadySubmitted)
        );
    }

    #[test]
    fn automatic_reasons_carry_a_notice() {
        let mut session = active(60, 1);
        session.begin_submission(SubmitReason::LeftFullscreen).unwrap();
        assert_eq!(
            session.notice().map(|n| n.message.as_str()),
            Some("Test submitted due to exiting fullscreen mode.")
        );
        assert_eq!(
            session.last_reason().map(SubmitReason::annotation),
            Some("submitted: left fullscreen")
        );
    }
}
