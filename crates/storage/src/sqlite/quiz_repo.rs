use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tutor_core::model::{Question, Quiz, QuizId, TopicId};

use super::SqliteRepository;
use super::mapping::{
    conn, encode_options, id_to_i64, index_to_i64, map_quiz_row, optional_index_from_i64,
    question_id_from_i64, quiz_id_from_i64, ser, unprocessable,
};
use crate::repository::{
    AttemptAnswerRecord, AttemptRecord, NewQuestionRecord, NewQuizRecord, QuizRepository,
    StorageError, SubmittedAnswer,
};

fn count_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

impl SqliteRepository {
    async fn attempt_answers(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AttemptAnswerRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, selected_answer, is_correct
            FROM attempt_answers
            WHERE attempt_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(AttemptAnswerRecord {
                question_id: question_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
                selected_answer: optional_index_from_i64(
                    row.try_get("selected_answer").map_err(ser)?,
                )?,
                is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
            });
        }
        Ok(answers)
    }
}

#[async_trait]
impl QuizRepository for SqliteRepository {
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let row = sqlx::query("SELECT id, title, description FROM quizzes WHERE id = ?1")
            .bind(id_to_i64(id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        self.load_questions(map_quiz_row(&row)?).await
    }

    async fn submit_attempt(
        &self,
        quiz_id: QuizId,
        answers: &[SubmittedAnswer],
    ) -> Result<AttemptRecord, StorageError> {
        let quiz = self.get_quiz(quiz_id).await?;
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
        let completed_at: DateTime<Utc> = Utc::now();

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let res = sqlx::query(
            r"
            INSERT INTO quiz_attempts (quiz_id, score, total_questions, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64(quiz_id.value())?)
        .bind(index_to_i64(score)?)
        .bind(index_to_i64(total)?)
        .bind(completed_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let attempt_id = res.last_insert_rowid();

        for (position, answer) in graded.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO attempt_answers
                    (attempt_id, position, question_id, selected_answer, is_correct)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(attempt_id)
            .bind(index_to_i64(position)?)
            .bind(id_to_i64(answer.question_id.value())?)
            .bind(answer.selected_answer.map(index_to_i64).transpose()?)
            .bind(i64::from(answer.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;

        Ok(AttemptRecord {
            id: u64::try_from(attempt_id).ok(),
            quiz_id,
            score: u32::try_from(score).ok(),
            total_questions: u32::try_from(total).ok(),
            answers: graded,
            completed_at: Some(completed_at),
        })
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, score, total_questions, completed_at
            FROM quiz_attempts
            WHERE quiz_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64(quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            attempts.push(AttemptRecord {
                id: u64::try_from(id).ok(),
                quiz_id,
                score: Some(count_to_u32("score", row.try_get("score").map_err(ser)?)?),
                total_questions: Some(count_to_u32(
                    "total_questions",
                    row.try_get("total_questions").map_err(ser)?,
                )?),
                answers: self.attempt_answers(id).await?,
                completed_at: Some(row.try_get("completed_at").map_err(ser)?),
            });
        }
        Ok(attempts)
    }

    async fn create_quiz(
        &self,
        topic_id: TopicId,
        record: &NewQuizRecord,
    ) -> Result<Quiz, StorageError> {
        let title = record.title.trim();
        if title.is_empty() {
            return Err(unprocessable("quiz title cannot be empty"));
        }
        let topic = id_to_i64(topic_id.value())?;
        if !self.topic_exists(topic).await? {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO quizzes (topic_id, title, description, order_index)
            VALUES (
                ?1, ?2, ?3,
                COALESCE(?4, (SELECT COALESCE(MAX(order_index), 0) + 1
                              FROM quizzes WHERE topic_id = ?1))
            )
            ",
        )
        .bind(topic)
        .bind(title)
        .bind(record.description.as_deref())
        .bind(record.order_index)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(Quiz::new(quiz_id_from_i64(res.last_insert_rowid())?, title)
            .with_description(record.description.clone()))
    }

    async fn add_question(
        &self,
        quiz_id: QuizId,
        record: &NewQuestionRecord,
    ) -> Result<Question, StorageError> {
        let prompt = record.question.trim();
        Question::check(prompt, &record.options, record.correct_answer).map_err(unprocessable)?;
        let quiz = id_to_i64(quiz_id.value())?;
        let exists = sqlx::query("SELECT 1 FROM quizzes WHERE id = ?1")
            .bind(quiz)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO questions (quiz_id, question, options, correct_answer, order_index)
            VALUES (
                ?1, ?2, ?3, ?4,
                COALESCE(?5, (SELECT COALESCE(MAX(order_index), 0) + 1
                              FROM questions WHERE quiz_id = ?1))
            )
            ",
        )
        .bind(quiz)
        .bind(prompt)
        .bind(encode_options(&record.options)?)
        .bind(index_to_i64(record.correct_answer)?)
        .bind(record.order_index)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Question::new(
            question_id_from_i64(res.last_insert_rowid())?,
            prompt,
            record.options.clone(),
            record.correct_answer,
        )
        .map_err(ser)
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(id_to_i64(id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
