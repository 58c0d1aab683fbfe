use thiserror::Error;

use crate::model::{InvalidOption, ParseIdError, QuestionError, SessionStateError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Option(#[from] InvalidOption),
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Session(#[from] SessionStateError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, SelectedOption};

    fn parse_answer(question: &str, option: u8) -> Result<(QuestionId, SelectedOption), Error> {
        Ok((question.parse()?, SelectedOption::new(option)?))
    }

    #[test]
    fn domain_errors_convert_into_the_umbrella() {
        assert!(parse_answer(" 7 ", 2).is_ok());
        assert!(matches!(parse_answer("x", 2), Err(Error::Id(_))));
        assert!(matches!(parse_answer("7", 5), Err(Error::Option(_))));
    }
}
