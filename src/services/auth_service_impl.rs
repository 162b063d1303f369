//! `SeaORM` implementation of the `AuthService` trait.

use crate::db::{Store, User};
use crate::domain::UserId;
use crate::services::auth_service::{AuthError, AuthService, Identity, LoginResult};
use async_trait::async_trait;

pub struct SeaOrmAuthService {
    store: Store,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

fn identity(user: User) -> Identity {
    Identity {
        user_id: UserId::new(user.id),
        username: user.username,
        role: user.role,
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .store
            .verify_credentials(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(LoginResult {
            id: UserId::new(user.id),
            username: user.username,
            api_key: user.api_key,
        })
    }

    async fn verify_api_key(&self, api_key: &str) -> Result<Option<Identity>, AuthError> {
        let user = self.store.verify_api_key(api_key).await?;
        Ok(user.map(identity))
    }

    async fn identity_for(&self, user_id: UserId) -> Result<Option<Identity>, AuthError> {
        let user = self.store.get_user(user_id.value()).await?;
        Ok(user.map(identity))
    }
}
