use thiserror::Error;

use crate::model::{ChatError, CredentialsError, LessonError, QuestionError, TopicError};

/// Umbrella for every validation failure the domain model can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
}
