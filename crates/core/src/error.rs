use thiserror::Error;

use crate::model::{AnswerError, PaperError, SessionError, ViolationError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Paper(#[from] PaperError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Violation(#[from] ViolationError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}
