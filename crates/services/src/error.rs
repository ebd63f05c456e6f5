//! Shared error types for the services crate.

use thiserror::Error;

use storage::http::HttpInitError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutor_core::model::{
    ChatError, CredentialsError, LessonError, LessonId, QuestionError, QuizId, TopicError, TopicId,
};

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unauthorized(_) => AuthError::NotSignedIn,
            StorageError::Conflict(message) | StorageError::Rejected { message, .. } => {
                AuthError::Rejected(message)
            }
            other => AuthError::Storage(other),
        }
    }
}

/// Errors emitted by `ContentStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error("quiz title cannot be empty")]
    EmptyQuizTitle,
    #[error("topic {0} not found")]
    UnknownTopic(TopicId),
    #[error("lesson {0} not found")]
    UnknownLesson(LessonId),
    #[error("quiz {0} not found")]
    UnknownQuiz(QuizId),
    #[error("complete the earlier lessons first")]
    Locked,
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ContentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unauthorized(_) => ContentError::NotSignedIn,
            other => ContentError::Storage(other),
        }
    }
}

/// Errors emitted by `QuizRunner`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no question is awaiting an answer")]
    NotAnswering,
    #[error("option {index} is out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("select an answer first")]
    NoSelection,
    #[error("the quiz is not finished yet")]
    NotComplete,
}

/// Errors emitted by `QuizLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

/// Errors emitted by `ChatService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatServiceError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("the chat for lesson {0} has not been opened")]
    NotReady(LessonId),
}

/// Errors emitted by tutor responders.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("the AI tutor is not configured")]
    Disabled,
    #[error("the tutor returned an empty response")]
    EmptyResponse,
    #[error("tutor request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Http(#[from] HttpInitError),
}
