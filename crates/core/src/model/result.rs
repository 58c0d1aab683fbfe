use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ScheduleId, SelectedOption, UserId};

/// Score breakdown returned by the grading endpoint after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
}

impl ScoreBreakdown {
    /// Questions neither right nor wrong, i.e. left at option 0.
    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.total_questions
            .saturating_sub(self.correct_answers)
            .saturating_sub(self.wrong_answers)
    }
}

/// How one question was answered in a graded attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedResponse {
    pub question_text: String,
    pub selected_option: SelectedOption,
    pub correct_option: SelectedOption,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRef {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub id: u64,
    pub title: String,
}

/// Graded outcome of one schedule, as shown on the results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub schedule_id: ScheduleId,
    pub test_time: DateTime<Utc>,
    pub is_completed: bool,
    pub score: u32,
    pub responses: Vec<GradedResponse>,
    pub student: Option<StudentRef>,
    pub job: Option<JobRef>,
}

impl TestResult {
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_correct).count()
    }
}

/// A schedule the student may take right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSchedule {
    pub id: ScheduleId,
    pub job_title: String,
    pub test_time: DateTime<Utc>,
    pub duration_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanswered_is_the_remainder() {
        let score = ScoreBreakdown {
            score: 3,
            total_questions: 10,
            correct_answers: 3,
            wrong_answers: 4,
        };
        assert_eq!(score.unanswered(), 3);
    }
}
