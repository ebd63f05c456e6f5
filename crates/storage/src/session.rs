use std::sync::{Arc, PoisonError, RwLock};

use tutor_core::model::{AuthSession, User};

/// Shared view of the signed-in session.
///
/// The HTTP adapter reads the bearer token from here and clears it on `401`;
/// the auth service writes it on login and logout.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, session: AuthSession) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Drops the session. Returns `true` if one was present.
    pub fn clear(&self) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<AuthSession> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.get().map(|s| s.token().to_owned())
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.get().map(|s| s.user().clone())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
