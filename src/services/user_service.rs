//! Domain service for accounts and subscriptions.

use serde::Serialize;
use thiserror::Error;

use crate::domain::recipe::FieldError;
use crate::domain::{Actor, Page, UserId};
use crate::services::recipe_service::RecipeSummary;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User {0} not found")]
    NotFound(UserId),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("You cannot subscribe to yourself")]
    SelfFollow,

    #[error("Already subscribed to user {0}")]
    AlreadyFollowing(UserId),

    #[error("Not subscribed to user {0}")]
    NotFollowing(UserId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Registration payload after format checks.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Public user card. `is_subscribed` is relative to the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub api_key: String,
}

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: u64,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Field`] for a short password or a taken username/email.
    async fn register(&self, registration: Registration) -> Result<RegisteredUser, UserError>;

    async fn list(
        &self,
        viewer: Option<UserId>,
        page: u64,
        limit: u64,
    ) -> Result<Page<UserProfile>, UserError>;

    async fn get(&self, viewer: Option<UserId>, id: UserId) -> Result<UserProfile, UserError>;

    async fn me(&self, actor: Actor) -> Result<UserProfile, UserError>;

    /// # Errors
    ///
    /// Returns [`UserError::Field`] on `current_password` when it does not match,
    /// or on `new_password` when it is too short.
    async fn set_password(
        &self,
        actor: Actor,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserError>;

    /// Follows `target` and returns its subscription card.
    async fn subscribe(
        &self,
        actor: Actor,
        target: UserId,
        recipes_limit: Option<usize>,
    ) -> Result<Subscription, UserError>;

    async fn unsubscribe(&self, actor: Actor, target: UserId) -> Result<(), UserError>;

    async fn subscriptions(
        &self,
        actor: Actor,
        page: u64,
        limit: u64,
        recipes_limit: Option<usize>,
    ) -> Result<Page<Subscription>, UserError>;
}
