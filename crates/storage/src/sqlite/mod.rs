use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::http::{HttpConfig, HttpInitError};
use crate::memory::InMemoryRepository;
use crate::repository::{Storage, StorageError};

mod chat_repo;
mod mapping;
mod migrate;
mod quiz_repo;
mod seed;
mod session_repo;
mod topic_repo;

/// Local `SQLite` database holding client-side state.
///
/// Online it only keeps the signed-in session; offline it also holds the
/// content, progress, attempts and chat logs.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Http(#[from] HttpInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = database_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` that talks to the REST backend and keeps the
    /// signed-in session in a local `SQLite` file.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated,
    /// or the HTTP client cannot be configured.
    pub async fn http_with_sqlite(
        config: &HttpConfig,
        database_url: &str,
    ) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self::http(config, Arc::new(repo))?)
    }

    /// Build a `Storage` that serves content from a local `SQLite` file,
    /// seeding the sample topics on first use.
    ///
    /// Accounts and the session stay in memory: offline sign-ins never
    /// replace the session saved for the REST backend.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened, migrated
    /// or seeded.
    pub async fn offline(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        repo.seed_demo_content().await?;
        let repo = Arc::new(repo);

        let accounts = InMemoryRepository::new();
        let session = accounts.session_handle();
        Ok(Self {
            auth: Arc::new(accounts.clone()),
            topics: repo.clone(),
            lessons: repo.clone(),
            quizzes: repo.clone(),
            chat: repo,
            sessions: Arc::new(accounts),
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
