use std::sync::Arc;

use storage::http::HttpConfig;
use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::AuthService;
use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::quizzes::QuizLoopService;
use crate::topics::ContentStore;
use crate::tutor::{BackendTutor, MockTutor, OpenAiTutor, TutorResponder};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    content: ContentStore,
    quizzes: Arc<QuizLoopService>,
    chat: Arc<ChatService>,
}

impl AppServices {
    /// Build services from configuration and restore any saved session.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the local database or the HTTP client
    /// cannot be set up.
    pub async fn from_config(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = if config.offline {
            log::info!("offline mode: serving content from {}", config.db_url);
            Storage::offline(&config.db_url).await?
        } else {
            let http = HttpConfig {
                base_url: config.api_url.clone(),
                ..HttpConfig::default()
            };
            Storage::http_with_sqlite(&http, &config.db_url).await?
        };

        let tutor: Arc<dyn TutorResponder> = match (&config.ai, config.offline) {
            (Some(ai), _) => {
                log::info!("tutor replies come from {} ({})", ai.base_url, ai.model);
                Arc::new(OpenAiTutor::new(ai.clone()))
            }
            (None, true) => Arc::new(MockTutor),
            (None, false) => Arc::new(BackendTutor::new(Arc::clone(&storage.chat))),
        };

        let services = Self::from_storage(&storage, clock, tutor);
        if let Err(err) = services.auth.restore().await {
            log::error!("could not restore the saved session: {err}");
        }
        Ok(services)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, tutor: Arc<dyn TutorResponder>) -> Self {
        let content = ContentStore::from_storage(storage);
        Self {
            auth: Arc::new(AuthService::from_storage(storage)),
            quizzes: Arc::new(QuizLoopService::from_storage(content.clone(), storage)),
            chat: Arc::new(ChatService::from_storage(clock, storage, tutor)),
            content,
        }
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn content(&self) -> ContentStore {
        self.content.clone()
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat)
    }
}
