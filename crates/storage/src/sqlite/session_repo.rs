use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tutor_core::model::{AuthSession, User, UserId};

use crate::repository::{SessionStore, StorageError};

use super::SqliteRepository;

#[async_trait]
impl SessionStore for SqliteRepository {
    async fn load_session(&self) -> Result<Option<AuthSession>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT token, user_id, username, email
            FROM auth_sessions
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let token: String = row
            .try_get("token")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let user_id: i64 = row
            .try_get("user_id")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let email: Option<String> = row
            .try_get("email")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        let user_id = u64::try_from(user_id)
            .map_err(|_| StorageError::Serialization(format!("negative user id {user_id}")))?;
        let user = User {
            id: UserId::new(user_id),
            username,
            email,
        };
        Ok(Some(AuthSession::new(token, user)))
    }

    async fn save_session(&self, session: &AuthSession) -> Result<(), StorageError> {
        let user = session.user();
        let user_id = i64::try_from(user.id.value())
            .map_err(|_| StorageError::Serialization(format!("user id {} out of range", user.id)))?;

        sqlx::query(
            r"
            INSERT INTO auth_sessions (id, token, user_id, username, email, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                user_id = excluded.user_id,
                username = excluded.username,
                email = excluded.email,
                saved_at = excluded.saved_at
            ",
        )
        .bind(1_i64)
        .bind(session.token())
        .bind(user_id)
        .bind(&user.username)
        .bind(user.email.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
