use std::fmt;

use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialsError {
    #[error("Username and password are required")]
    MissingUsernameOrPassword,

    #[error("Email is required for registration")]
    MissingEmail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
}

/// Signed-in state: the bearer token plus the account it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    token: String,
    user: User,
}

impl AuthSession {
    #[must_use]
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }
}

// Keep tokens out of logs.
impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Validated login or registration input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    email: Option<String>,
    password: String,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns `CredentialsError::MissingUsernameOrPassword` if either is blank.
    pub fn login(username: &str, password: &str) -> Result<Self, CredentialsError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(CredentialsError::MissingUsernameOrPassword);
        }
        Ok(Self {
            username: username.to_owned(),
            email: None,
            password: password.to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns `CredentialsError` if username, password, or email is blank.
    pub fn register(username: &str, email: &str, password: &str) -> Result<Self, CredentialsError> {
        let mut credentials = Self::login(username, password)?;
        let email = email.trim();
        if email.is_empty() {
            return Err(CredentialsError::MissingEmail);
        }
        credentials.email = Some(email.to_owned());
        Ok(credentials)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_username_and_password() {
        assert_eq!(
            Credentials::login("", "secret").unwrap_err(),
            CredentialsError::MissingUsernameOrPassword
        );
        assert_eq!(
            Credentials::login("ada", "").unwrap_err(),
            CredentialsError::MissingUsernameOrPassword
        );
        assert_eq!(Credentials::login(" ada ", "pw").unwrap().username(), "ada");
    }

    #[test]
    fn register_requires_email() {
        assert_eq!(
            Credentials::register("ada", " ", "pw").unwrap_err(),
            CredentialsError::MissingEmail
        );
        let creds = Credentials::register("ada", "ada@example.com", "pw").unwrap();
        assert_eq!(creds.email(), Some("ada@example.com"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let session = AuthSession::new(
            "tok-123",
            User {
                id: UserId::new(1),
                username: "ada".into(),
                email: None,
            },
        );
        assert!(!format!("{session:?}").contains("tok-123"));
        let creds = Credentials::login("ada", "hunter2").unwrap();
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
