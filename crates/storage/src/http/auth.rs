use async_trait::async_trait;
use reqwest::Method;
use tutor_core::model::{AuthSession, Credentials, User};

use super::HttpRepository;
use super::wire::{AuthResponse, LoginBody, ProfileResponse, RegisterBody};
use crate::repository::{AuthRepository, StorageError};

#[async_trait]
impl AuthRepository for HttpRepository {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, StorageError> {
        let body = LoginBody {
            username: credentials.username(),
            password: credentials.password(),
        };
        let response: AuthResponse = self
            .send_json(self.request(Method::POST, "/auth/login").json(&body))
            .await?;
        response.into_session()
    }

    async fn register(&self, credentials: &Credentials) -> Result<AuthSession, StorageError> {
        let body = RegisterBody {
            username: credentials.username(),
            email: credentials.email().unwrap_or_default(),
            password: credentials.password(),
        };
        let response: AuthResponse = self
            .send_json(self.request(Method::POST, "/auth/register").json(&body))
            .await?;
        response.into_session()
    }

    async fn profile(&self) -> Result<User, StorageError> {
        let response: ProfileResponse = self
            .send_json(self.request(Method::GET, "/auth/profile"))
            .await?;
        Ok(response.into())
    }
}
