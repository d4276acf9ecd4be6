use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{PasswordError, PasswordHasher, TokenError, TokenIssuer};
use crate::database::models::User;
use crate::database::{DatabaseError, UserRepository};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    /// Unknown email and wrong password both land here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    Unauthorized,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Blocking task failed: {0}")]
    Task(String),
}

/// Registration, login and bearer-token authentication over a user repository.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self { users, hasher, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create an account and return a fresh access token for it.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = self.hash_password(password).await?;

        let user = match self.users.create(email, &password_hash).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email
            Err(DatabaseError::UniqueViolation(_)) => {
                warn!("Registration rejected: email claimed concurrently");
                return Err(AuthError::EmailAlreadyRegistered);
            }
            Err(e) => return Err(e.into()),
        };

        info!("Registered user {}", user.id);
        Ok(self.tokens.issue(&user.email)?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!("Login rejected: unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            warn!("Login rejected: password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        info!("User {} logged in", user.id);
        Ok(self.tokens.issue(&user.email)?)
    }

    /// Resolve a bearer token back to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let subject = self.tokens.verify(token).map_err(|e| {
            warn!("Bearer token rejected: {}", e);
            AuthError::Unauthorized
        })?;

        match self.users.find_by_email(&subject).await? {
            Some(user) => Ok(user),
            None => {
                warn!("Bearer token subject no longer exists");
                Err(AuthError::Unauthorized)
            }
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher;
        let password = password.to_string();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))
    }
}
