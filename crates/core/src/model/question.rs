use thiserror::Error;

use crate::model::{QuestionId, SelectedOption};

/// Only the first ten questions of a schedule are ever presented.
pub const QUESTION_LIMIT: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has empty text")]
    EmptyText { id: QuestionId },
}

/// A multiple-choice question with exactly four options.
///
/// Immutable once constructed; options are addressed 1..=4 to match the
/// numbering the grading endpoint expects. Option text is shown as sent, blank
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: [String; 4],
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the question text is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: [String; 4],
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText { id });
        }
        Ok(Self { id, text, options })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; 4] {
        &self.options
    }

    /// Text of the given option, `None` for `SelectedOption::NONE`.
    #[must_use]
    pub fn option_text(&self, option: SelectedOption) -> Option<&str> {
        option
            .index()
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }
}
