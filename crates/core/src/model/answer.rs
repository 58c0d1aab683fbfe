use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Question, QuestionId};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("option {0} is out of range (expected 0..=4)")]
pub struct InvalidOption(pub u8);

/// A selected option: 0 means "no answer", 1..=4 picks an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SelectedOption(u8);

impl SelectedOption {
    pub const NONE: Self = Self(0);
    pub const MAX: u8 = 4;

    /// # Errors
    ///
    /// Returns `InvalidOption` for values above 4.
    pub fn new(value: u8) -> Result<Self, InvalidOption> {
        if value > Self::MAX {
            return Err(InvalidOption(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_answered(self) -> bool {
        self.0 != 0
    }

    /// Zero-based index into a question's options, if answered.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        self.is_answered().then(|| usize::from(self.0 - 1))
    }
}

impl TryFrom<u8> for SelectedOption {
    type Error = InvalidOption;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SelectedOption> for u8 {
    fn from(option: SelectedOption) -> Self {
        option.0
    }
}

/// One line of a submission payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: QuestionId,
    pub selected_option: SelectedOption,
}

/// In-memory answer collector. Last write wins; nothing is validated for
/// completeness, unanswered questions are reported as option 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    selections: HashMap<QuestionId, SelectedOption>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection, replacing any earlier one for the same question.
    pub fn select(&mut self, question: QuestionId, option: SelectedOption) {
        self.selections.insert(question, option);
    }

    #[must_use]
    pub fn selected(&self, question: QuestionId) -> SelectedOption {
        self.selections
            .get(&question)
            .copied()
            .unwrap_or(SelectedOption::NONE)
    }

    /// Number of questions with a non-zero selection.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selections.values().filter(|o| o.is_answered()).count()
    }

    /// Build payload entries in question order, one per question.
    #[must_use]
    pub fn entries(&self, questions: &[Question]) -> Vec<AnswerEntry> {
        questions
            .iter()
            .map(|q| AnswerEntry {
                question_id: q.id(),
                selected_option: self.selected(q.id()),
            })
            .collect()
    }
}
