use tutor_core::model::Topic;

use super::SqliteRepository;
use super::mapping::{conn, encode_options, id_to_i64, index_to_i64};
use crate::memory::demo_topics;
use crate::repository::StorageError;

impl SqliteRepository {
    /// Loads the sample topics into an empty database.
    ///
    /// Returns `false` without writing anything when topics already exist, so
    /// progress recorded in earlier runs is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the database cannot be read or written.
    pub async fn seed_demo_content(&self) -> Result<bool, StorageError> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        if existing > 0 {
            return Ok(false);
        }
        let topics = demo_topics().map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.insert_topics(&topics).await?;
        log::info!("seeded {} demo topics", topics.len());
        Ok(true)
    }

    /// Writes whole topics, keeping their ids and list order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any row is rejected; nothing is written then.
    pub async fn insert_topics(&self, topics: &[Topic]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for topic in topics {
            let topic_id = id_to_i64(topic.id().value())?;
            sqlx::query("INSERT INTO topics (id, name, description) VALUES (?1, ?2, ?3)")
                .bind(topic_id)
                .bind(topic.name())
                .bind(topic.description())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;

            for (position, lesson) in topic.lessons().iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO lessons (id, topic_id, title, content, order_index, completed)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(id_to_i64(lesson.id().value())?)
                .bind(topic_id)
                .bind(lesson.title())
                .bind(lesson.content())
                .bind(index_to_i64(position + 1)?)
                .bind(i64::from(lesson.is_completed()))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }

            for (position, quiz) in topic.quizzes().iter().enumerate() {
                let quiz_id = id_to_i64(quiz.id().value())?;
                sqlx::query(
                    r"
                    INSERT INTO quizzes (id, topic_id, title, description, order_index)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ",
                )
                .bind(quiz_id)
                .bind(topic_id)
                .bind(quiz.title())
                .bind(quiz.description())
                .bind(index_to_i64(position + 1)?)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;

                for (index, question) in quiz.questions().iter().enumerate() {
                    sqlx::query(
                        r"
                        INSERT INTO questions
                            (id, quiz_id, question, options, correct_answer, order_index)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        ",
                    )
                    .bind(id_to_i64(question.id().value())?)
                    .bind(quiz_id)
                    .bind(question.prompt())
                    .bind(encode_options(question.options())?)
                    .bind(index_to_i64(question.correct_answer().unwrap_or(0))?)
                    .bind(index_to_i64(index + 1)?)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                }
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
