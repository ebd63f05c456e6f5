//! JSON shapes exchanged with the REST backend and their mapping to domain types.
//!
//! Decoding is lenient: snake_case and camelCase field names are both
//! accepted, counts may arrive as strings, and list endpoints may return a
//! bare array or an object wrapping one. Content that cannot be used as-is is
//! normalized (with a warning) instead of failing the whole response.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tutor_core::model::{
    AuthSession, ChatMessage, Lesson, LessonId, Question, QuestionId, Quiz, QuizId, Speaker, Topic,
    TopicId, TopicSummary, User, UserId,
};

use crate::repository::{AttemptAnswerRecord, AttemptRecord, StorageError, SubmittedAnswer};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

//
// ─── ENVELOPES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(
            alias = "topics",
            alias = "messages",
            alias = "attempts",
            alias = "items"
        )]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

//
// ─── AUTH ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterBody<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    id: u64,
    username: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        User {
            id: UserId::new(dto.id),
            username: dto.username,
            email: dto.email.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    token: String,
    user: UserDto,
}

impl AuthResponse {
    pub(crate) fn into_session(self) -> Result<AuthSession, StorageError> {
        if self.token.trim().is_empty() {
            return Err(StorageError::Serialization("empty auth token".into()));
        }
        Ok(AuthSession::new(self.token, self.user.into()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileResponse {
    Wrapped { user: UserDto },
    Bare(UserDto),
}

impl From<ProfileResponse> for User {
    fn from(response: ProfileResponse) -> Self {
        match response {
            ProfileResponse::Wrapped { user } | ProfileResponse::Bare(user) => user.into(),
        }
    }
}

//
// ─── TOPICS & LESSONS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct TopicBody<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicDto {
    id: u64,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "lessonCount")]
    lesson_count: Option<Value>,
    #[serde(default, alias = "quizCount")]
    quiz_count: Option<Value>,
    #[serde(default, alias = "completedLessons", alias = "completed_count")]
    completed_lessons: Option<Value>,
    #[serde(default)]
    lessons: Option<Vec<Value>>,
    #[serde(default)]
    quizzes: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonDto {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "orderIndex")]
    order_index: Option<i64>,
    #[serde(default, alias = "is_completed", alias = "isCompleted")]
    completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LessonBody<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub order_index: Option<i64>,
}

/// Single-record endpoints answer either with the record or an object wrapping it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Single<T> {
    Wrapped {
        #[serde(alias = "lesson", alias = "quiz", alias = "question")]
        data: T,
    },
    Bare(T),
}

impl<T> Single<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Single::Wrapped { data } | Single::Bare(data) => data,
        }
    }
}

/// Decodes list entries one at a time, skipping (and logging) the ones that don't fit.
pub(crate) fn decode_each<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(dto) => Some(dto),
            Err(err) => {
                log::warn!("skipping unreadable {what}: {err}");
                None
            }
        })
        .collect()
}

/// Reads a count that may be a JSON number or a numeric string.
fn count(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Stable sort by backend position; entries without one keep arrival order at the end.
fn sort_by_position<T>(items: &mut [T], position: impl Fn(&T) -> Option<i64>) {
    items.sort_by_key(|item| position(item).unwrap_or(i64::MAX));
}

/// Returns the trimmed text, or `placeholder` when it is missing or blank.
fn text_or(text: Option<String>, placeholder: impl FnOnce() -> String) -> String {
    match text {
        Some(text) if !text.trim().is_empty() => text,
        _ => placeholder(),
    }
}

pub(crate) fn lesson_from_dto(dto: LessonDto) -> Result<Lesson, StorageError> {
    let id = LessonId::new(dto.id);
    let title = text_or(dto.title, || {
        log::warn!("lesson {id} has no title; using a placeholder");
        format!("Lesson {id}")
    });
    Lesson::from_persisted(
        id,
        title,
        dto.content.unwrap_or_default(),
        dto.completed.unwrap_or(false),
    )
    .map_err(ser)
}

pub(crate) fn topic_from_dto(dto: TopicDto) -> Result<Topic, StorageError> {
    let mut lessons: Vec<LessonDto> = decode_each(dto.lessons.unwrap_or_default(), "lesson");
    sort_by_position(&mut lessons, |l| l.order_index);
    let mut quizzes: Vec<QuizDto> = decode_each(dto.quizzes.unwrap_or_default(), "quiz");
    sort_by_position(&mut quizzes, |q| q.order_index);

    let lessons = lessons
        .into_iter()
        .filter_map(|lesson| match lesson_from_dto(lesson) {
            Ok(lesson) => Some(lesson),
            Err(err) => {
                log::warn!("skipping lesson: {err}");
                None
            }
        })
        .collect();
    let quizzes = quizzes.into_iter().map(quiz_from_dto).collect();

    Ok(Topic::new(TopicId::new(dto.id), dto.name, dto.description)
        .map_err(ser)?
        .with_content(lessons, quizzes))
}

pub(crate) fn summary_from_dto(dto: TopicDto) -> Result<TopicSummary, StorageError> {
    let lesson_count = count(dto.lesson_count.as_ref());
    let quiz_count = count(dto.quiz_count.as_ref());
    let completed_lessons = count(dto.completed_lessons.as_ref());
    let topic = topic_from_dto(dto)?;
    let derived = topic.summary();
    Ok(TopicSummary {
        lesson_count: lesson_count.unwrap_or(derived.lesson_count),
        quiz_count: quiz_count.unwrap_or(derived.quiz_count),
        completed_lessons: completed_lessons.unwrap_or(derived.completed_lessons),
        ..derived
    })
}

//
// ─── QUIZZES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct QuizDto {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "orderIndex")]
    order_index: Option<i64>,
    #[serde(default)]
    questions: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizBody<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub order_index: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionBody<'a> {
    pub question: &'a str,
    pub options: &'a [String],
    pub correct_answer: usize,
    pub order_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionDto {
    id: u64,
    #[serde(default, alias = "prompt", alias = "text")]
    question: Option<String>,
    #[serde(default)]
    options: Value,
    #[serde(default, alias = "correctAnswer")]
    correct_answer: Option<i64>,
    #[serde(default, alias = "orderIndex")]
    order_index: Option<i64>,
}

/// Reads option labels from an array of strings or a JSON-encoded array.
///
/// Anything else (objects, numbers, arrays containing non-strings) is `None`.
pub(crate) fn decode_options(raw: &Value) -> Option<Vec<String>> {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(ToOwned::to_owned))
            .collect(),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(decoded @ Value::Array(_)) => decode_options(&decoded),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn question_from_dto(dto: QuestionDto) -> Question {
    let id = QuestionId::new(dto.id);
    let prompt = text_or(dto.question, || {
        log::warn!("question {id} has no text; using a placeholder");
        format!("Question {id}")
    });
    let Some(options) = decode_options(&dto.options) else {
        log::warn!("question {id} has malformed options; showing it without choices");
        return Question::without_options(id, prompt);
    };
    let correct = dto.correct_answer.and_then(|c| usize::try_from(c).ok());
    let Some(correct) = correct else {
        log::warn!("question {id} has no usable correct answer; showing it without choices");
        return Question::without_options(id, prompt);
    };
    match Question::new(id, prompt.clone(), options, correct) {
        Ok(question) => question,
        Err(err) => {
            log::warn!("question {id} is inconsistent ({err}); showing it without choices");
            Question::without_options(id, prompt)
        }
    }
}

pub(crate) fn quiz_from_dto(dto: QuizDto) -> Quiz {
    let id = QuizId::new(dto.id);
    let raw = dto.questions.unwrap_or_else(|| {
        log::warn!("quiz {id} arrived without a question list");
        Vec::new()
    });
    let mut questions: Vec<QuestionDto> = decode_each(raw, "question");
    sort_by_position(&mut questions, |q| q.order_index);
    let title = text_or(dto.title, || format!("Quiz {id}"));
    Quiz::new(id, title)
        .with_description(dto.description)
        .with_questions(questions.into_iter().map(question_from_dto).collect())
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitBody {
    answers: Vec<AnswerBody>,
}

#[derive(Debug, Serialize)]
struct AnswerBody {
    #[serde(rename = "questionId")]
    question_id: u64,
    #[serde(rename = "selectedAnswer")]
    selected_answer: Option<usize>,
}

impl SubmitBody {
    pub(crate) fn new(answers: &[SubmittedAnswer]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|a| AnswerBody {
                    question_id: a.question_id.value(),
                    selected_answer: a.selected_answer,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptDto {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    score: Option<Value>,
    #[serde(default, alias = "totalQuestions", alias = "total")]
    total_questions: Option<Value>,
    #[serde(default)]
    answers: Option<Vec<AttemptAnswerDto>>,
    #[serde(default, alias = "completedAt", alias = "created_at")]
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AttemptAnswerDto {
    #[serde(alias = "questionId")]
    question_id: u64,
    #[serde(default, alias = "selectedAnswer")]
    selected_answer: Option<i64>,
    #[serde(default, alias = "isCorrect")]
    is_correct: Option<bool>,
}

/// Submission endpoints answer either with the attempt or `{ "attempt": … }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AttemptResponse {
    Wrapped { attempt: AttemptDto },
    Bare(AttemptDto),
}

impl AttemptResponse {
    pub(crate) fn into_dto(self) -> AttemptDto {
        match self {
            AttemptResponse::Wrapped { attempt } | AttemptResponse::Bare(attempt) => attempt,
        }
    }
}

pub(crate) fn attempt_from_dto(quiz_id: QuizId, dto: AttemptDto) -> AttemptRecord {
    let to_u32 = |v: Option<&Value>| count(v).and_then(|n| u32::try_from(n).ok());
    AttemptRecord {
        id: dto.id,
        quiz_id,
        score: to_u32(dto.score.as_ref()),
        total_questions: to_u32(dto.total_questions.as_ref()),
        answers: dto
            .answers
            .unwrap_or_default()
            .into_iter()
            .map(|a| AttemptAnswerRecord {
                question_id: QuestionId::new(a.question_id),
                selected_answer: a.selected_answer.and_then(|s| usize::try_from(s).ok()),
                is_correct: a.is_correct.unwrap_or(false),
            })
            .collect(),
        completed_at: dto.completed_at,
    }
}

//
// ─── CHAT ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct MessageBody<'a> {
    pub message: &'a str,
    pub is_user: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDto {
    #[serde(alias = "text", alias = "content")]
    message: String,
    #[serde(default, alias = "isUser")]
    is_user: Option<bool>,
    #[serde(default, alias = "createdAt", alias = "timestamp")]
    created_at: Option<DateTime<Utc>>,
}

/// Converts stored messages, dropping blank ones.
pub(crate) fn messages_from_dtos(
    dtos: Vec<MessageDto>,
    received_at: DateTime<Utc>,
) -> Vec<ChatMessage> {
    dtos.into_iter()
        .filter_map(|dto| {
            let speaker = if dto.is_user.unwrap_or(false) {
                Speaker::Learner
            } else {
                Speaker::Tutor
            };
            let created_at = dto.created_at.unwrap_or(received_at);
            match ChatMessage::new(dto.message, speaker, created_at) {
                Ok(message) => Some(message),
                Err(err) => {
                    log::warn!("skipping stored chat message: {err}");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct TutorPromptBody<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TutorReplyDto {
    #[serde(alias = "reply", alias = "message", alias = "text")]
    response: String,
}

impl TutorReplyDto {
    pub(crate) fn into_text(self) -> Result<String, StorageError> {
        let text = self.response.trim();
        if text.is_empty() {
            return Err(StorageError::Serialization("empty tutor reply".into()));
        }
        Ok(text.to_owned())
    }
}
