use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tutor_core::model::{
    AuthSession, ChatMessage, Credentials, Lesson, LessonId, Question, QuestionId, Quiz, QuizId,
    Topic, TopicId, TopicSummary, User,
};

pub use crate::memory::InMemoryRepository;
use crate::session::SessionHandle;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Payload for creating or editing a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopicRecord {
    pub name: String,
    pub description: Option<String>,
}

/// Payload for creating or editing a lesson.
///
/// `order_index` is the position within the topic; `None` on an edit keeps
/// the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLessonRecord {
    pub title: String,
    pub content: String,
    pub order_index: Option<i64>,
}

/// Payload for creating a quiz inside a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizRecord {
    pub title: String,
    pub description: Option<String>,
    pub order_index: Option<i64>,
}

/// Payload for appending a question to a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestionRecord {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub order_index: Option<i64>,
}

/// One answer as sent to the backend on quiz submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_answer: Option<usize>,
}

/// One answer as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptAnswerRecord {
    pub question_id: QuestionId,
    pub selected_answer: Option<usize>,
    pub is_correct: bool,
}

/// A quiz attempt as stored by the backend.
///
/// Backends differ in which aggregate fields they echo back, so everything
/// except the quiz id and the answer list is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub id: Option<u64>,
    pub quiz_id: QuizId,
    pub score: Option<u32>,
    pub total_questions: Option<u32>,
    pub answers: Vec<AttemptAnswerRecord>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` for bad credentials.
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the account already exists.
    async fn register(&self, credentials: &Credentials) -> Result<AuthSession, StorageError>;

    /// Fetch the account behind the current token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` when no valid session exists.
    async fn profile(&self) -> Result<User, StorageError>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// List topics with aggregate counts only.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decoding failures.
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, StorageError>;

    /// Fetch a topic with its ordered lessons and quizzes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn create_topic(&self, topic: &NewTopicRecord) -> Result<TopicSummary, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn update_topic(&self, id: TopicId, topic: &NewTopicRecord) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn complete_lesson(&self, id: LessonId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn uncomplete_lesson(&self, id: LessonId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn create_lesson(
        &self,
        topic_id: TopicId,
        lesson: &NewLessonRecord,
    ) -> Result<Lesson, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn update_lesson(&self, id: LessonId, lesson: &NewLessonRecord)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Fetch a quiz with its ordered, normalized questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// Store a finished attempt and return the backend's copy.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt is not accepted.
    async fn submit_attempt(
        &self,
        quiz_id: QuizId,
        answers: &[SubmittedAnswer],
    ) -> Result<AttemptRecord, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on transport or decoding failures.
    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptRecord>, StorageError>;

    /// Create an empty quiz at the given position of a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn create_quiz(&self, topic_id: TopicId, quiz: &NewQuizRecord)
    -> Result<Quiz, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn add_question(
        &self,
        quiz_id: QuizId,
        question: &NewQuestionRecord,
    ) -> Result<Question, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Stored messages for a lesson, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decoding failures.
    async fn list_messages(
        &self,
        lesson_id: LessonId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatMessage>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the message is not stored.
    async fn append_message(
        &self,
        lesson_id: LessonId,
        message: &ChatMessage,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be cleared.
    async fn clear_messages(&self, lesson_id: LessonId) -> Result<(), StorageError>;

    /// Ask the backend tutor for a markdown reply.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if no reply is produced.
    async fn tutor_reply(&self, message: &str) -> Result<String, StorageError>;
}

/// Client-side persistence of the signed-in session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the stored session cannot be read.
    async fn load_session(&self) -> Result<Option<AuthSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be written.
    async fn save_session(&self, session: &AuthSession) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be removed.
    async fn clear_session(&self) -> Result<(), StorageError>;
}

/// Aggregates repositories behind trait objects so backends can be swapped.
#[derive(Clone)]
pub struct Storage {
    pub auth: Arc<dyn AuthRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub chat: Arc<dyn ChatRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub session: SessionHandle,
}

impl Storage {
    /// Empty in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(InMemoryRepository::new())
    }

    /// In-memory backend preloaded with sample topics.
    #[must_use]
    pub fn demo() -> Self {
        Self::from_memory(InMemoryRepository::with_demo_content())
    }

    #[must_use]
    pub fn from_memory(repo: InMemoryRepository) -> Self {
        let session = repo.session_handle();
        Self {
            auth: Arc::new(repo.clone()),
            topics: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            chat: Arc::new(repo.clone()),
            sessions: Arc::new(repo),
            session,
        }
    }
}
