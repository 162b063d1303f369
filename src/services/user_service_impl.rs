//! `SeaORM` implementation of the `UserService` trait.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, User};
use crate::domain::recipe::FieldError;
use crate::domain::{Actor, Page, UserId};
use crate::services::recipe_service::RecipeSummary;
use crate::services::user_service::{
    RegisteredUser, Registration, Subscription, UserError, UserProfile, UserService,
};

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    fn check_password(&self, field: &'static str, password: &str) -> Result<(), UserError> {
        let min = self.security.min_password_length;
        if password.chars().count() < min {
            return Err(FieldError::new(
                field,
                format!("Password must be at least {min} characters"),
            )
            .into());
        }
        Ok(())
    }

    async fn existing_user(&self, id: UserId) -> Result<User, UserError> {
        self.store
            .get_user(id.value())
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn subscription_cards(
        &self,
        authors: Vec<User>,
        recipes_limit: Option<usize>,
    ) -> Result<Vec<Subscription>, UserError> {
        let author_ids: Vec<i32> = authors.iter().map(|u| u.id).collect();

        let mut by_author: HashMap<i32, Vec<RecipeSummary>> = HashMap::new();
        for recipe in self.store.list_recipes_by_authors(&author_ids).await? {
            by_author
                .entry(recipe.author_id)
                .or_default()
                .push(RecipeSummary::from(recipe));
        }

        Ok(authors
            .into_iter()
            .map(|author| {
                let mut recipes = by_author.remove(&author.id).unwrap_or_default();
                let recipes_count = recipes.len() as u64;
                if let Some(limit) = recipes_limit {
                    recipes.truncate(limit);
                }

                Subscription {
                    profile: profile(author, true),
                    recipes,
                    recipes_count,
                }
            })
            .collect())
    }
}

pub(crate) fn profile(user: User, is_subscribed: bool) -> UserProfile {
    UserProfile {
        email: user.email,
        id: UserId::new(user.id),
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn register(&self, registration: Registration) -> Result<RegisteredUser, UserError> {
        self.check_password("password", &registration.password)?;

        if let Some(field) = self
            .store
            .find_taken_identity(&registration.username, &registration.email)
            .await?
        {
            return Err(FieldError::new(field, format!("A user with that {field} already exists")).into());
        }

        let user = self
            .store
            .create_user(
                NewUser {
                    username: registration.username,
                    email: registration.email,
                    first_name: registration.first_name,
                    last_name: registration.last_name,
                    password: registration.password,
                },
                &self.security,
            )
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");

        Ok(RegisteredUser {
            email: user.email,
            id: UserId::new(user.id),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            api_key: user.api_key,
        })
    }

    async fn list(
        &self,
        viewer: Option<UserId>,
        page: u64,
        limit: u64,
    ) -> Result<Page<UserProfile>, UserError> {
        let (users, count, total_pages) = self.store.list_users(page, limit).await?;

        let followed: HashSet<i32> = match viewer {
            Some(viewer) => {
                let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
                self.store
                    .followed_among(viewer.value(), &ids)
                    .await?
                    .into_iter()
                    .collect()
            }
            None => HashSet::new(),
        };

        Ok(Page {
            count,
            total_pages,
            results: users
                .into_iter()
                .map(|u| {
                    let subscribed = followed.contains(&u.id);
                    profile(u, subscribed)
                })
                .collect(),
        })
    }

    async fn get(&self, viewer: Option<UserId>, id: UserId) -> Result<UserProfile, UserError> {
        let user = self.existing_user(id).await?;

        let subscribed = match viewer {
            Some(viewer) => !self
                .store
                .followed_among(viewer.value(), &[user.id])
                .await?
                .is_empty(),
            None => false,
        };

        Ok(profile(user, subscribed))
    }

    async fn me(&self, actor: Actor) -> Result<UserProfile, UserError> {
        let user = self.existing_user(actor.id).await?;
        Ok(profile(user, false))
    }

    async fn set_password(
        &self,
        actor: Actor,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        if !self
            .store
            .verify_user_password(actor.id.value(), current_password)
            .await?
        {
            return Err(FieldError::new("current_password", "Current password is incorrect").into());
        }

        self.check_password("new_password", new_password)?;

        self.store
            .update_user_password(actor.id.value(), new_password, &self.security)
            .await?;

        info!(user_id = %actor.id, "Password changed");
        Ok(())
    }

    async fn subscribe(
        &self,
        actor: Actor,
        target: UserId,
        recipes_limit: Option<usize>,
    ) -> Result<Subscription, UserError> {
        let author = self.existing_user(target).await?;

        if actor.id == target {
            return Err(UserError::SelfFollow);
        }

        if !self.store.follow(actor.id.value(), target.value()).await? {
            return Err(UserError::AlreadyFollowing(target));
        }

        info!(user_id = %actor.id, following_id = %target, "Subscribed");

        let mut cards = self.subscription_cards(vec![author], recipes_limit).await?;
        cards
            .pop()
            .ok_or_else(|| UserError::Internal("Subscription card missing".to_string()))
    }

    async fn unsubscribe(&self, actor: Actor, target: UserId) -> Result<(), UserError> {
        self.existing_user(target).await?;

        if !self.store.unfollow(actor.id.value(), target.value()).await? {
            return Err(UserError::NotFollowing(target));
        }

        info!(user_id = %actor.id, following_id = %target, "Unsubscribed");
        Ok(())
    }

    async fn subscriptions(
        &self,
        actor: Actor,
        page: u64,
        limit: u64,
        recipes_limit: Option<usize>,
    ) -> Result<Page<Subscription>, UserError> {
        let (authors, count, total_pages) = self
            .store
            .list_following(actor.id.value(), page, limit)
            .await?;

        Ok(Page {
            count,
            total_pages,
            results: self.subscription_cards(authors, recipes_limit).await?,
        })
    }
}
