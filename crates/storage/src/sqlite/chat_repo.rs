use async_trait::async_trait;
use sqlx::Row;
use tutor_core::model::{CANNED_TUTOR_REPLIES, ChatMessage, LessonId, Speaker};

use super::SqliteRepository;
use super::mapping::{conn, count_from_i64, id_to_i64, ser};
use crate::repository::{ChatRepository, StorageError};

#[async_trait]
impl ChatRepository for SqliteRepository {
    async fn list_messages(
        &self,
        lesson_id: LessonId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT message, is_user, created_at
            FROM chat_messages
            WHERE lesson_id = ?1
            ORDER BY id ASC
            LIMIT ?2 OFFSET ?3
            ",
        )
        .bind(id_to_i64(lesson_id.value())?)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let speaker = if row.try_get::<i64, _>("is_user").map_err(ser)? != 0 {
                Speaker::Learner
            } else {
                Speaker::Tutor
            };
            let message = ChatMessage::new(
                row.try_get::<String, _>("message").map_err(ser)?,
                speaker,
                row.try_get("created_at").map_err(ser)?,
            );
            match message {
                Ok(message) => messages.push(message),
                Err(err) => log::warn!("skipping stored chat message: {err}"),
            }
        }
        Ok(messages)
    }

    async fn append_message(
        &self,
        lesson_id: LessonId,
        message: &ChatMessage,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO chat_messages (lesson_id, message, is_user, created_at)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (SELECT 1 FROM lessons WHERE id = ?1)
            ",
        )
        .bind(id_to_i64(lesson_id.value())?)
        .bind(message.text())
        .bind(i64::from(message.is_from_user()))
        .bind(message.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn clear_messages(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM chat_messages WHERE lesson_id = ?1")
            .bind(id_to_i64(lesson_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    /// Rotates through the canned replies, continuing where the stored log left off.
    async fn tutor_reply(&self, _message: &str) -> Result<String, StorageError> {
        let (given,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM chat_messages WHERE is_user = 0")
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
        let given = count_from_i64("reply count", given)?;
        Ok(CANNED_TUTOR_REPLIES[given % CANNED_TUTOR_REPLIES.len()].to_owned())
    }
}
