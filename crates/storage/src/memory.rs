//! In-process backend for tests, demos, and offline use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tutor_core::error::Error as DomainError;
use tutor_core::model::{
    AuthSession, CANNED_TUTOR_REPLIES, ChatMessage, Credentials, Lesson, LessonId, Question,
    QuestionId, Quiz, QuizId, Topic, TopicId, TopicSummary, User, UserId,
};

use crate::repository::{
    AttemptAnswerRecord, AttemptRecord, AuthRepository, ChatRepository, LessonRepository,
    NewLessonRecord, NewQuestionRecord, NewQuizRecord, NewTopicRecord, QuizRepository,
    SessionStore, StorageError, SubmittedAnswer, TopicRepository,
};
use crate::session::SessionHandle;

struct Account {
    password: String,
    user: User,
}

#[derive(Default)]
struct State {
    topics: Vec<Topic>,
    messages: HashMap<LessonId, Vec<ChatMessage>>,
    attempts: HashMap<QuizId, Vec<AttemptRecord>>,
    accounts: HashMap<String, Account>,
    stored_session: Option<AuthSession>,
    next_topic_id: u64,
    next_user_id: u64,
    next_attempt_id: u64,
    issued_tokens: u64,
    reply_cursor: usize,
}

impl State {
    fn issue_session(&mut self, user: User) -> AuthSession {
        self.issued_tokens += 1;
        AuthSession::new(format!("memory-token-{}", self.issued_tokens), user)
    }

    fn create_account(&mut self, credentials: &Credentials) -> User {
        self.next_user_id += 1;
        let user = User {
            id: UserId::new(self.next_user_id),
            username: credentials.username().to_owned(),
            email: credentials.email().map(ToOwned::to_owned),
        };
        self.accounts.insert(
            credentials.username().to_owned(),
            Account {
                password: credentials.password().to_owned(),
                user: user.clone(),
            },
        );
        user
    }

    fn topic_mut(&mut self, id: TopicId) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.id() == id)
    }

    fn lesson_topic_mut(&mut self, id: LessonId) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.lesson(id).is_some())
    }

    fn quiz_topic_mut(&mut self, id: QuizId) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.quiz(id).is_some())
    }

    fn quiz(&self, id: QuizId) -> Option<&Quiz> {
        self.topics.iter().find_map(|topic| topic.quiz(id))
    }

    fn next_lesson_id(&self) -> LessonId {
        let max = self
            .topics
            .iter()
            .flat_map(Topic::lessons)
            .map(|l| l.id().value())
            .max()
            .unwrap_or(0);
        LessonId::new(max + 1)
    }

    fn next_quiz_id(&self) -> QuizId {
        let max = self
            .topics
            .iter()
            .flat_map(Topic::quizzes)
            .map(|q| q.id().value())
            .max()
            .unwrap_or(0);
        QuizId::new(max + 1)
    }

    fn next_question_id(&self) -> QuestionId {
        let max = self
            .topics
            .iter()
            .flat_map(Topic::quizzes)
            .flat_map(Quiz::questions)
            .map(|q| q.id().value())
            .max()
            .unwrap_or(0);
        QuestionId::new(max + 1)
    }
}

/// Backend that keeps everything in process memory.
///
/// Login accepts any username: unknown users are enrolled on the spot, so the
/// demo can be driven without registering first.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
    session: SessionHandle,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_topics(topics: Vec<Topic>) -> Self {
        let next_topic_id = topics.iter().map(|t| t.id().value()).max().unwrap_or(0);
        let repo = Self::new();
        if let Ok(mut state) = repo.state.lock() {
            state.topics = topics;
            state.next_topic_id = next_topic_id;
        }
        repo
    }

    /// Two sample topics with lessons and quizzes.
    #[must_use]
    pub fn with_demo_content() -> Self {
        let topics = demo_topics().unwrap_or_else(|err| {
            log::error!("demo content failed validation: {err}");
            Vec::new()
        });
        Self::with_topics(topics)
    }

    #[must_use]
    pub fn session_handle(&self) -> SessionHandle {
        self.session.clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn unprocessable(err: impl std::fmt::Display) -> StorageError {
    StorageError::Rejected {
        status: 422,
        message: err.to_string(),
    }
}

#[async_trait]
impl AuthRepository for InMemoryRepository {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, StorageError> {
        let mut state = self.lock()?;
        let user = match state.accounts.get(credentials.username()) {
            Some(account) if account.password == credentials.password() => account.user.clone(),
            Some(_) => return Err(StorageError::Unauthorized("invalid credentials".into())),
            None => state.create_account(credentials),
        };
        Ok(state.issue_session(user))
    }

    async fn register(&self, credentials: &Credentials) -> Result<AuthSession, StorageError> {
        let mut state = self.lock()?;
        if state.accounts.contains_key(credentials.username()) {
            return Err(StorageError::Conflict(format!(
                "username {} is taken",
                credentials.username()
            )));
        }
        let user = state.create_account(credentials);
        Ok(state.issue_session(user))
    }

    async fn profile(&self) -> Result<User, StorageError> {
        self.session
            .user()
            .ok_or_else(|| StorageError::Unauthorized("not signed in".into()))
    }
}

#[async_trait]
impl TopicRepository for InMemoryRepository {
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, StorageError> {
        let state = self.lock()?;
        Ok(state.topics.iter().map(Topic::summary).collect())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let state = self.lock()?;
        state
            .topics
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn create_topic(&self, record: &NewTopicRecord) -> Result<TopicSummary, StorageError> {
        let mut state = self.lock()?;
        let id = TopicId::new(state.next_topic_id + 1);
        let topic = Topic::new(id, record.name.clone(), record.description.clone())
            .map_err(unprocessable)?;
        state.next_topic_id += 1;
        let summary = topic.summary();
        state.topics.push(topic);
        Ok(summary)
    }

    async fn update_topic(&self, id: TopicId, record: &NewTopicRecord) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let topic = state
            .topics
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(StorageError::NotFound)?;
        topic
            .rename(record.name.clone(), record.description.clone())
            .map_err(unprocessable)
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let before = state.topics.len();
        state.topics.retain(|t| t.id() != id);
        if state.topics.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn complete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let topic = state.lesson_topic_mut(id).ok_or(StorageError::NotFound)?;
        topic.complete_lesson(id).map_err(unprocessable)?;
        Ok(())
    }

    async fn uncomplete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let topic = state.lesson_topic_mut(id).ok_or(StorageError::NotFound)?;
        topic.uncomplete_lesson(id).map_err(unprocessable)?;
        Ok(())
    }

    async fn create_lesson(
        &self,
        topic_id: TopicId,
        record: &NewLessonRecord,
    ) -> Result<Lesson, StorageError> {
        let mut state = self.lock()?;
        let id = state.next_lesson_id();
        let lesson =
            Lesson::new(id, record.title.clone(), record.content.clone()).map_err(unprocessable)?;
        let topic = state.topic_mut(topic_id).ok_or(StorageError::NotFound)?;
        topic.push_lesson(lesson.clone());
        Ok(lesson)
    }

    async fn update_lesson(
        &self,
        id: LessonId,
        record: &NewLessonRecord,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let topic = state.lesson_topic_mut(id).ok_or(StorageError::NotFound)?;
        topic
            .edit_lesson(id, record.title.clone(), record.content.clone())
            .map_err(unprocessable)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let topic = state.lesson_topic_mut(id).ok_or(StorageError::NotFound)?;
        topic.remove_lesson(id);
        state.messages.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let state = self.lock()?;
        state.quiz(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn submit_attempt(
        &self,
        quiz_id: QuizId,
        answers: &[SubmittedAnswer],
    ) -> Result<AttemptRecord, StorageError> {
        let mut state = self.lock()?;
        let quiz = state.quiz(quiz_id).ok_or(StorageError::NotFound)?;
        let graded: Vec<AttemptAnswerRecord> = answers
            .iter()
            .map(|answer| AttemptAnswerRecord {
                question_id: answer.question_id,
                selected_answer: answer.selected_answer,
                is_correct: quiz
                    .questions()
                    .iter()
                    .find(|q| q.id() == answer.question_id)
                    .is_some_and(|q| q.is_correct(answer.selected_answer)),
            })
            .collect();
        let score = graded.iter().filter(|a| a.is_correct).count();
        let total = quiz.question_count();

        state.next_attempt_id += 1;
        let record = AttemptRecord {
            id: Some(state.next_attempt_id),
            quiz_id,
            score: u32::try_from(score).ok(),
            total_questions: u32::try_from(total).ok(),
            answers: graded,
            completed_at: None,
        };
        state
            .attempts
            .entry(quiz_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.attempts.get(&quiz_id).cloned().unwrap_or_default())
    }

    async fn create_quiz(
        &self,
        topic_id: TopicId,
        record: &NewQuizRecord,
    ) -> Result<Quiz, StorageError> {
        let mut state = self.lock()?;
        let quiz = Quiz::new(state.next_quiz_id(), record.title.trim())
            .with_description(record.description.clone());
        let topic = state.topic_mut(topic_id).ok_or(StorageError::NotFound)?;
        topic.push_quiz(quiz.clone());
        Ok(quiz)
    }

    async fn add_question(
        &self,
        quiz_id: QuizId,
        record: &NewQuestionRecord,
    ) -> Result<Question, StorageError> {
        let mut state = self.lock()?;
        let question = Question::new(
            state.next_question_id(),
            record.question.trim(),
            record.options.clone(),
            record.correct_answer,
        )
        .map_err(unprocessable)?;
        let topic = state.quiz_topic_mut(quiz_id).ok_or(StorageError::NotFound)?;
        topic
            .add_question(quiz_id, question.clone())
            .map_err(unprocessable)?;
        Ok(question)
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let topic = state.quiz_topic_mut(id).ok_or(StorageError::NotFound)?;
        topic.remove_quiz(id);
        state.attempts.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for InMemoryRepository {
    async fn list_messages(
        &self,
        lesson_id: LessonId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let state = self.lock()?;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(state
            .messages
            .get(&lesson_id)
            .map(|log| log.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        lesson_id: LessonId,
        message: &ChatMessage,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .messages
            .entry(lesson_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn clear_messages(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.messages.remove(&lesson_id);
        Ok(())
    }

    async fn tutor_reply(&self, _message: &str) -> Result<String, StorageError> {
        let mut state = self.lock()?;
        let reply = CANNED_TUTOR_REPLIES[state.reply_cursor % CANNED_TUTOR_REPLIES.len()];
        state.reply_cursor += 1;
        Ok(reply.to_owned())
    }
}

#[async_trait]
impl SessionStore for InMemoryRepository {
    async fn load_session(&self) -> Result<Option<AuthSession>, StorageError> {
        Ok(self.lock()?.stored_session.clone())
    }

    async fn save_session(&self, session: &AuthSession) -> Result<(), StorageError> {
        self.lock()?.stored_session = Some(session.clone());
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        self.lock()?.stored_session = None;
        Ok(())
    }
}

//
// ─── DEMO CONTENT ──────────────────────────────────────────────────────────────
//

fn question(
    id: u64,
    prompt: &str,
    options: &[&str],
    correct: usize,
) -> Result<Question, DomainError> {
    let options = options.iter().map(|o| (*o).to_owned()).collect();
    Ok(Question::new(QuestionId::new(id), prompt, options, correct)?)
}

/// Sample content shared by the in-memory demo and the offline database seed.
pub(crate) fn demo_topics() -> Result<Vec<Topic>, DomainError> {
    let react = Topic::new(
        TopicId::new(1),
        "Introduction to React",
        Some("Components, JSX and the ideas behind them".into()),
    )?
    .with_content(
        vec![
            Lesson::new(
                LessonId::new(1),
                "What is React?",
                "React is a library for building user interfaces.",
            )?,
            Lesson::new(
                LessonId::new(2),
                "JSX Basics",
                "JSX lets you write markup inside JavaScript.",
            )?,
            Lesson::new(
                LessonId::new(3),
                "Components",
                "Components are reusable pieces of UI.",
            )?,
        ],
        vec![Quiz::new(QuizId::new(1), "React Fundamentals Quiz").with_questions(vec![
            question(
                1,
                "What is React?",
                &["A library", "A framework", "A language", "A database"],
                0,
            )?,
            question(
                2,
                "What does JSX stand for?",
                &["JavaScript XML", "Java Syntax Extension", "JavaScript Extension", "Java XML"],
                0,
            )?,
        ])],
    );

    let javascript = Topic::new(TopicId::new(2), "JavaScript Basics", None)?.with_content(
        vec![
            Lesson::new(
                LessonId::new(4),
                "Variables and Data Types",
                "let, const and the primitive types.",
            )?,
            Lesson::new(LessonId::new(5), "Functions", "Declaring and calling functions.")?,
        ],
        vec![Quiz::new(QuizId::new(2), "JavaScript Quiz").with_questions(vec![question(
            3,
            "Which keyword is used to declare a constant?",
            &["var", "let", "const", "static"],
            2,
        )?])],
    );

    Ok(vec![react, javascript])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::time::fixed_now;

    #[tokio::test]
    async fn demo_content_lists_two_topics_with_counts() {
        let repo = InMemoryRepository::with_demo_content();
        let topics = repo.list_topics().await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].lesson_count, 3);
        assert_eq!(topics[0].quiz_count, 1);
        assert_eq!(topics[1].name, "JavaScript Basics");
    }

    #[tokio::test]
    async fn created_topics_get_fresh_ids() {
        let repo = InMemoryRepository::with_demo_content();
        let created = repo
            .create_topic(&NewTopicRecord {
                name: "Rust".into(),
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, TopicId::new(3));
        assert_eq!(created.lesson_count, 0);
    }

    #[tokio::test]
    async fn lesson_completion_round_trips() {
        let repo = InMemoryRepository::with_demo_content();
        repo.complete_lesson(LessonId::new(2)).await.unwrap();
        let topic = repo.get_topic(TopicId::new(1)).await.unwrap();
        assert!(topic.lesson(LessonId::new(2)).unwrap().is_completed());

        repo.uncomplete_lesson(LessonId::new(2)).await.unwrap();
        let topic = repo.get_topic(TopicId::new(1)).await.unwrap();
        assert!(!topic.lesson(LessonId::new(2)).unwrap().is_completed());

        let err = repo.complete_lesson(LessonId::new(99)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn authored_content_gets_fresh_ids_and_can_be_removed() {
        let repo = InMemoryRepository::with_demo_content();
        let lesson = repo
            .create_lesson(
                TopicId::new(2),
                &NewLessonRecord {
                    title: "Closures".into(),
                    content: String::new(),
                    order_index: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(lesson.id(), LessonId::new(6));

        let quiz = repo
            .create_quiz(
                TopicId::new(2),
                &NewQuizRecord {
                    title: "Closures Quiz".into(),
                    description: None,
                    order_index: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(quiz.id(), QuizId::new(3));
        let question = repo
            .add_question(
                quiz.id(),
                &NewQuestionRecord {
                    question: "Do closures capture scope?".into(),
                    options: vec!["Yes".into(), "No".into()],
                    correct_answer: 0,
                    order_index: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(question.id(), QuestionId::new(4));

        let topic = repo.get_topic(TopicId::new(2)).await.unwrap();
        assert_eq!(topic.lessons().len(), 3);
        assert_eq!(topic.quiz(quiz.id()).unwrap().question_count(), 1);

        repo.delete_lesson(lesson.id()).await.unwrap();
        repo.delete_quiz(quiz.id()).await.unwrap();
        let topic = repo.get_topic(TopicId::new(2)).await.unwrap();
        assert_eq!(topic.lessons().len(), 2);
        assert!(topic.quiz(quiz.id()).is_none());
        assert!(matches!(
            repo.delete_quiz(quiz.id()).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn submitted_attempts_are_graded_and_listed() {
        let repo = InMemoryRepository::with_demo_content();
        let record = repo
            .submit_attempt(
                QuizId::new(1),
                &[
                    SubmittedAnswer {
                        question_id: QuestionId::new(1),
                        selected_answer: Some(0),
                    },
                    SubmittedAnswer {
                        question_id: QuestionId::new(2),
                        selected_answer: Some(3),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(record.score, Some(1));
        assert_eq!(record.total_questions, Some(2));
        assert!(record.answers[0].is_correct);
        assert!(!record.answers[1].is_correct);

        let attempts = repo.list_attempts(QuizId::new(1)).await.unwrap();
        assert_eq!(attempts.len(), 1);
    }

    #[tokio::test]
    async fn chat_log_pages_and_clears() {
        let repo = InMemoryRepository::new();
        let lesson = LessonId::new(1);
        for text in ["one", "two", "three"] {
            let message = ChatMessage::learner(text, fixed_now()).unwrap();
            repo.append_message(lesson, &message).await.unwrap();
        }
        let page = repo.list_messages(lesson, 2, 1).await.unwrap();
        let texts: Vec<_> = page.iter().map(ChatMessage::text).collect();
        assert_eq!(texts, ["two", "three"]);

        repo.clear_messages(lesson).await.unwrap();
        assert!(repo.list_messages(lesson, 50, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tutor_replies_rotate_through_canned_answers() {
        let repo = InMemoryRepository::new();
        let first = repo.tutor_reply("hi").await.unwrap();
        let second = repo.tutor_reply("hi").await.unwrap();
        assert_eq!(first, CANNED_TUTOR_REPLIES[0]);
        assert_eq!(second, CANNED_TUTOR_REPLIES[1]);
    }

    #[tokio::test]
    async fn login_enrolls_unknown_users_but_checks_known_passwords() {
        let repo = InMemoryRepository::new();
        let creds = Credentials::login("ada", "pw").unwrap();
        let session = repo.login(&creds).await.unwrap();
        assert_eq!(session.user().username, "ada");

        let wrong = Credentials::login("ada", "nope").unwrap();
        let err = repo.login(&wrong).await.unwrap_err();
        assert!(matches!(err, StorageError::Unauthorized(_)));

        let dup = Credentials::register("ada", "ada@example.com", "pw").unwrap();
        assert!(matches!(
            repo.register(&dup).await.unwrap_err(),
            StorageError::Conflict(_)
        ));
    }
}
