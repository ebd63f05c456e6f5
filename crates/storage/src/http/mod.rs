//! REST adapter for the learning-platform backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::repository::{SessionStore, Storage, StorageError};
use crate::session::SessionHandle;

mod auth;
mod chat;
mod quiz;
mod topics;
mod wire;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpInitError {
    #[error("invalid API base url: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Talks JSON to the backend with bearer-token auth.
///
/// Any `401` clears both the shared session handle and the persisted session,
/// which is how an expired token forces the user back to sign-in.
#[derive(Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
    session: SessionHandle,
    store: Arc<dyn SessionStore>,
}

impl HttpRepository {
    /// # Errors
    ///
    /// Returns `HttpInitError` if the base url is not http(s) or the client
    /// cannot be built.
    pub fn new(
        config: &HttpConfig,
        session: SessionHandle,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, HttpInitError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpInitError::InvalidBaseUrl(config.base_url.clone()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url,
            session,
            store,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        log::debug!("{method} {url}");
        let builder = self.client.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        match status {
            StatusCode::UNAUTHORIZED => {
                self.force_logout().await;
                Err(StorageError::Unauthorized(message))
            }
            StatusCode::NOT_FOUND => Err(StorageError::NotFound),
            StatusCode::CONFLICT => Err(StorageError::Conflict(message)),
            other => Err(StorageError::Rejected {
                status: other.as_u16(),
                message,
            }),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StorageError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn force_logout(&self) {
        if self.session.clear() {
            log::warn!("backend rejected the session token; signing out");
        }
        if let Err(err) = self.store.clear_session().await {
            log::error!("failed to clear the stored session: {err}");
        }
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<wire::ErrorBody>(&body)
        .ok()
        .and_then(wire::ErrorBody::into_message)
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_owned()
            } else {
                body.to_owned()
            }
        })
}

impl Storage {
    /// Build a `Storage` that talks to the REST backend.
    ///
    /// `sessions` keeps the signed-in session across runs; a stored session
    /// is not loaded here, see the auth service's restore step.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the HTTP client cannot be configured.
    pub fn http(
        config: &HttpConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, HttpInitError> {
        let session = SessionHandle::new();
        let repo = HttpRepository::new(config, session.clone(), Arc::clone(&sessions))?;
        Ok(Self {
            auth: Arc::new(repo.clone()),
            topics: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            chat: Arc::new(repo),
            sessions,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;

    #[test]
    fn rejects_non_http_base_urls() {
        let config = HttpConfig {
            base_url: "localhost:5000".into(),
            ..HttpConfig::default()
        };
        let result = HttpRepository::new(
            &config,
            SessionHandle::new(),
            Arc::new(InMemoryRepository::new()),
        );
        assert!(matches!(result, Err(HttpInitError::InvalidBaseUrl(_))));
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let config = HttpConfig {
            base_url: "http://localhost:5000/api/".into(),
            ..HttpConfig::default()
        };
        let repo = HttpRepository::new(
            &config,
            SessionHandle::new(),
            Arc::new(InMemoryRepository::new()),
        )
        .unwrap();
        assert_eq!(repo.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpRepository>();
    }
}
