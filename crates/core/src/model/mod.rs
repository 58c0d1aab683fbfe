mod answer;
mod ids;
mod progress;
mod question;
mod result;
mod schedule;
mod session;
mod user;

pub use ids::{ParseIdError, QuestionId, ScheduleId, UserId};

pub use answer::{AnswerEntry, AnswerSheet, InvalidOption, SelectedOption};
pub use progress::PersistedProgress;
pub use question::{QUESTION_LIMIT, Question, QuestionError};
pub use result::{GradedResponse, JobRef, OpenSchedule, ScoreBreakdown, StudentRef, TestResult};
pub use schedule::{DEFAULT_DURATION_MINUTES, Schedule, TestWindow};
pub use session::{
    Notice, NoticeLevel, SessionStateError, SessionStatus, SubmissionDraft, SubmitReason,
    TestSession,
};
pub use user::{Credentials, User};
