//! Domain service for authentication.
//!
//! Resolves API keys and session user ids to an [`Identity`] and verifies
//! email/password logins for the session endpoint.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Actor, Role, UserId};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }
}

/// Login result containing the user and their API key.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub id: UserId,
    pub username: String,
    pub api_key: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the email is unknown or the password wrong.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Returns the identity owning `api_key`, if any.
    async fn verify_api_key(&self, api_key: &str) -> Result<Option<Identity>, AuthError>;

    /// Re-reads a session user; `None` once the account no longer exists.
    async fn identity_for(&self, user_id: UserId) -> Result<Option<Identity>, AuthError>;
}
