use async_trait::async_trait;
use sqlx::Row;
use tutor_core::model::{Lesson, LessonId, Quiz, Topic, TopicId, TopicSummary};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, lesson_id_from_i64, map_lesson_row, map_question_row, map_quiz_row,
    map_summary_row, ser, topic_id_from_i64, unprocessable,
};
use crate::repository::{
    LessonRepository, NewLessonRecord, NewTopicRecord, StorageError, TopicRepository,
};

impl SqliteRepository {
    pub(super) async fn topic_exists(&self, id: i64) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM topics WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }

    /// Questions of one quiz in position order.
    pub(super) async fn load_questions(&self, quiz: Quiz) -> Result<Quiz, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question, options, correct_answer
            FROM questions
            WHERE quiz_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(id_to_i64(quiz.id().value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        Ok(quiz.with_questions(questions))
    }
}

#[async_trait]
impl TopicRepository for SqliteRepository {
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                t.id,
                t.name,
                t.description,
                (SELECT COUNT(*) FROM lessons l WHERE l.topic_id = t.id) AS lesson_count,
                (SELECT COUNT(*) FROM quizzes q WHERE q.topic_id = t.id) AS quiz_count,
                (SELECT COUNT(*) FROM lessons l WHERE l.topic_id = t.id AND l.completed = 1)
                    AS completed_lessons
            FROM topics t
            ORDER BY t.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            match map_summary_row(&row) {
                Ok(summary) => topics.push(summary),
                Err(err) => log::warn!("skipping stored topic: {err}"),
            }
        }
        Ok(topics)
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let topic_id = id_to_i64(id.value())?;
        let row = sqlx::query("SELECT id, name, description FROM topics WHERE id = ?1")
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let topic = Topic::new(
            topic_id_from_i64(row.try_get("id").map_err(ser)?)?,
            row.try_get::<String, _>("name").map_err(ser)?,
            row.try_get::<Option<String>, _>("description").map_err(ser)?,
        )
        .map_err(ser)?;

        let lesson_rows = sqlx::query(
            r"
            SELECT id, title, content, completed
            FROM lessons
            WHERE topic_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let mut lessons = Vec::with_capacity(lesson_rows.len());
        for row in lesson_rows {
            lessons.push(map_lesson_row(&row)?);
        }

        let quiz_rows = sqlx::query(
            r"
            SELECT id, title, description
            FROM quizzes
            WHERE topic_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let mut quizzes = Vec::with_capacity(quiz_rows.len());
        for row in quiz_rows {
            let quiz = map_quiz_row(&row)?;
            quizzes.push(self.load_questions(quiz).await?);
        }

        Ok(topic.with_content(lessons, quizzes))
    }

    async fn create_topic(&self, record: &NewTopicRecord) -> Result<TopicSummary, StorageError> {
        // Validate before touching the table; the id is a stand-in.
        let draft = Topic::new(TopicId::new(0), record.name.clone(), record.description.clone())
            .map_err(unprocessable)?;

        let res = sqlx::query("INSERT INTO topics (name, description) VALUES (?1, ?2)")
            .bind(draft.name())
            .bind(draft.description())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        Ok(TopicSummary {
            id: topic_id_from_i64(res.last_insert_rowid())?,
            ..draft.summary()
        })
    }

    async fn update_topic(&self, id: TopicId, record: &NewTopicRecord) -> Result<(), StorageError> {
        let draft = Topic::new(id, record.name.clone(), record.description.clone())
            .map_err(unprocessable)?;

        let res = sqlx::query("UPDATE topics SET name = ?2, description = ?3 WHERE id = ?1")
            .bind(id_to_i64(id.value())?)
            .bind(draft.name())
            .bind(draft.description())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM topics WHERE id = ?1")
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

impl SqliteRepository {
    async fn set_completed(&self, id: LessonId, completed: bool) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE lessons SET completed = ?2 WHERE id = ?1")
            .bind(id_to_i64(id.value())?)
            .bind(i64::from(completed))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for SqliteRepository {
    async fn complete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        self.set_completed(id, true).await
    }

    async fn uncomplete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        self.set_completed(id, false).await
    }

    async fn create_lesson(
        &self,
        topic_id: TopicId,
        record: &NewLessonRecord,
    ) -> Result<Lesson, StorageError> {
        let draft = Lesson::new(LessonId::new(0), record.title.clone(), record.content.clone())
            .map_err(unprocessable)?;
        let topic = id_to_i64(topic_id.value())?;
        if !self.topic_exists(topic).await? {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO lessons (topic_id, title, content, order_index, completed)
            VALUES (
                ?1, ?2, ?3,
                COALESCE(?4, (SELECT COALESCE(MAX(order_index), 0) + 1
                              FROM lessons WHERE topic_id = ?1)),
                0
            )
            ",
        )
        .bind(topic)
        .bind(draft.title())
        .bind(draft.content())
        .bind(record.order_index)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Lesson::new(
            lesson_id_from_i64(res.last_insert_rowid())?,
            draft.title(),
            draft.content(),
        )
        .map_err(ser)
    }

    async fn update_lesson(
        &self,
        id: LessonId,
        record: &NewLessonRecord,
    ) -> Result<(), StorageError> {
        let draft = Lesson::new(id, record.title.clone(), record.content.clone())
            .map_err(unprocessable)?;

        let res = sqlx::query(
            r"
            UPDATE lessons
            SET title = ?2,
                content = ?3,
                order_index = COALESCE(?4, order_index)
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64(id.value())?)
        .bind(draft.title())
        .bind(draft.content())
        .bind(record.order_index)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM lessons WHERE id = ?1")
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
