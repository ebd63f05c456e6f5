use std::sync::Arc;

use storage::repository::{AuthRepository, SessionStore, Storage, StorageError};
use storage::session::SessionHandle;
use tutor_core::model::{AuthSession, Credentials, User};

use crate::error::AuthError;

/// Holds the signed-in identity and keeps it in sync with the session store.
#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthRepository>,
    sessions: Arc<dyn SessionStore>,
    session: SessionHandle,
}

impl AuthService {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthRepository>,
        sessions: Arc<dyn SessionStore>,
        session: SessionHandle,
    ) -> Self {
        Self {
            auth,
            sessions,
            session,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.auth),
            Arc::clone(&storage.sessions),
            storage.session.clone(),
        )
    }

    /// # Errors
    ///
    /// Returns `AuthError::Credentials` for blank input before any request is
    /// made, or `AuthError::Rejected` with the backend's message.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let credentials = Credentials::login(username, password)?;
        let session = self
            .auth
            .login(&credentials)
            .await
            .map_err(rejection)?;
        self.store(session).await
    }

    /// # Errors
    ///
    /// Returns `AuthError::Credentials` for blank input before any request is
    /// made, or `AuthError::Rejected` with the backend's message.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let credentials = Credentials::register(username, email, password)?;
        let session = self
            .auth
            .register(&credentials)
            .await
            .map_err(rejection)?;
        self.store(session).await
    }

    /// Forget the session locally and in the session store.
    pub async fn logout(&self) {
        self.session.clear();
        if let Err(err) = self.sessions.clear_session().await {
            log::error!("failed to clear the stored session: {err}");
        }
    }

    /// Load a persisted session into the shared handle.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the session store cannot be read.
    pub async fn restore(&self) -> Result<Option<User>, AuthError> {
        let Some(session) = self.sessions.load_session().await? else {
            return Ok(None);
        };
        let user = session.user().clone();
        self.session.set(session);
        log::debug!("restored session for {}", user.username);
        Ok(Some(user))
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.session.is_signed_in()
    }

    /// Fetch the account behind the current token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without a session or when the backend
    /// rejects the token.
    pub async fn profile(&self) -> Result<User, AuthError> {
        if !self.is_signed_in() {
            return Err(AuthError::NotSignedIn);
        }
        Ok(self.auth.profile().await?)
    }

    async fn store(&self, session: AuthSession) -> Result<User, AuthError> {
        let user = session.user().clone();
        if let Err(err) = self.sessions.save_session(&session).await {
            log::error!("signed in but could not persist the session: {err}");
        }
        self.session.set(session);
        log::info!("signed in as {}", user.username);
        Ok(user)
    }
}

fn rejection(err: StorageError) -> AuthError {
    match err {
        StorageError::Unauthorized(message) => AuthError::Rejected(message),
        other => other.into(),
    }
}
