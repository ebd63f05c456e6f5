use std::sync::Arc;

use storage::repository::{AttemptRecord, QuizRepository, Storage};
use tutor_core::model::{QuizId, TopicId};

use super::runner::{QuizRunner, QuizState};
use crate::error::QuizServiceError;
use crate::topics::ContentStore;

/// Result of answering one question through `QuizLoopService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAdvance {
    pub state: QuizState,
    /// The backend's copy of the attempt, once the quiz is complete and the
    /// submission went through.
    pub attempt: Option<AttemptRecord>,
}

/// Starts quiz runs and submits finished attempts.
#[derive(Clone)]
pub struct QuizLoopService {
    content: ContentStore,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(content: ContentStore, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { content, quizzes }
    }

    #[must_use]
    pub fn from_storage(content: ContentStore, storage: &Storage) -> Self {
        Self::new(content, Arc::clone(&storage.quizzes))
    }

    /// Start a run of an unlocked quiz in a loaded topic.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Content` if the quiz is locked or cannot be
    /// found.
    pub async fn start(
        &self,
        topic_id: TopicId,
        quiz_id: QuizId,
    ) -> Result<QuizRunner, QuizServiceError> {
        self.content.ensure_quiz_unlocked(topic_id, quiz_id)?;
        let quiz = self.content.load_quiz(topic_id, quiz_id).await?;
        if !quiz.has_questions() {
            log::warn!("quiz {quiz_id} has no questions");
        }
        Ok(QuizRunner::new(quiz))
    }

    /// Answer the current question; submits the attempt when it was the last.
    ///
    /// A failed submission is logged and does not block completion.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if the runner rejects the step.
    pub async fn advance(&self, runner: &mut QuizRunner) -> Result<QuizAdvance, QuizServiceError> {
        let state = runner.advance()?;
        if state != QuizState::Complete {
            return Ok(QuizAdvance {
                state,
                attempt: None,
            });
        }

        let quiz_id = runner.quiz().id();
        let attempt = match self
            .quizzes
            .submit_attempt(quiz_id, &runner.submission())
            .await
        {
            Ok(record) => Some(record),
            Err(err) => {
                log::error!("failed to submit attempt for quiz {quiz_id}: {err}");
                None
            }
        };
        Ok(QuizAdvance { state, attempt })
    }

    /// Past attempts, empty if they cannot be loaded.
    pub async fn attempts(&self, quiz_id: QuizId) -> Vec<AttemptRecord> {
        match self.quizzes.list_attempts(quiz_id).await {
            Ok(attempts) => attempts,
            Err(err) => {
                log::error!("failed to load attempts for quiz {quiz_id}: {err}");
                Vec::new()
            }
        }
    }
}
