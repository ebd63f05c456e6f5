use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tutor_core::model::{
    Lesson, LessonId, Question, QuestionId, Quiz, QuizId, TopicId, TopicSummary,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_usize(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("id overflow".into()))
}

pub(crate) fn index_to_i64(v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("index overflow".into()))
}

pub(crate) fn topic_id_from_i64(v: i64) -> Result<TopicId, StorageError> {
    Ok(TopicId::new(i64_to_u64("topic_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn optional_index_from_i64(v: Option<i64>) -> Result<Option<usize>, StorageError> {
    v.map(|v| i64_to_usize("selected_answer", v)).transpose()
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    i64_to_usize(field, v)
}

pub(crate) fn map_summary_row(row: &SqliteRow) -> Result<TopicSummary, StorageError> {
    Ok(TopicSummary {
        id: topic_id_from_i64(row.try_get("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        lesson_count: count_from_i64("lesson_count", row.try_get("lesson_count").map_err(ser)?)?,
        quiz_count: count_from_i64("quiz_count", row.try_get("quiz_count").map_err(ser)?)?,
        completed_lessons: count_from_i64(
            "completed_lessons",
            row.try_get("completed_lessons").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Lesson::from_persisted(
        lesson_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("content").map_err(ser)?,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
    )
    .map_err(ser)
}

/// Quiz header only; questions are attached by the caller.
pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let id = quiz_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let description: Option<String> = row.try_get("description").map_err(ser)?;
    Ok(Quiz::new(id, title).with_description(description))
}

/// Rows whose options no longer decode are shown without choices.
pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let prompt: String = row.try_get("question").map_err(ser)?;
    let raw_options: String = row.try_get("options").map_err(ser)?;
    let correct = i64_to_usize("correct_answer", row.try_get("correct_answer").map_err(ser)?)?;

    let options = match serde_json::from_str::<Vec<String>>(&raw_options) {
        Ok(options) => options,
        Err(err) => {
            log::warn!("question {id} has unreadable options: {err}");
            return Ok(Question::without_options(id, prompt));
        }
    };
    match Question::new(id, prompt.clone(), options, correct) {
        Ok(question) => Ok(question),
        Err(err) => {
            log::warn!("question {id} is inconsistent ({err}); showing it without choices");
            Ok(Question::without_options(id, prompt))
        }
    }
}

pub(crate) fn encode_options(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

/// Content the store refuses, reported the way the REST backend reports validation failures.
pub(crate) fn unprocessable(err: impl core::fmt::Display) -> StorageError {
    StorageError::Rejected {
        status: 422,
        message: err.to_string(),
    }
}
