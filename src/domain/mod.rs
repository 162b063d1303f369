//! Domain types for the recipe catalogue.
//!
//! Newtype identifiers keep recipe and user ids from being mixed up at the
//! service boundary; the submodules hold the pure validation and rendering
//! logic that the services wrap with persistence.

pub mod recipe;
pub mod shopping_list;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::roles;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a recipe.
    RecipeId
);

entity_id!(
    /// Unique identifier for a user.
    UserId
);

/// Account role. Admins may edit and delete any recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => roles::USER,
            Self::Admin => roles::ADMIN,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            roles::USER => Ok(Self::User),
            roles::ADMIN => Ok(Self::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// Authors may change their own recipes, admins may change any.
    #[must_use]
    pub fn may_modify(&self, author: UserId) -> bool {
        self.id == author || self.role.is_admin()
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub total_pages: u64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            total_pages: 0,
            results: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            total_pages: self.total_pages,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_id_conversions() {
        let id = RecipeId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(RecipeId::from(42), id);
    }

    #[test]
    fn user_id_serialization() {
        let id = UserId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let deserialized: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn only_author_or_admin_may_modify() {
        let author = UserId::new(1);
        let user = Actor {
            id: UserId::new(2),
            role: Role::User,
        };
        let admin = Actor {
            id: UserId::new(3),
            role: Role::Admin,
        };
        assert!(!user.may_modify(author));
        assert!(admin.may_modify(author));
        assert!(user.may_modify(UserId::new(2)));
    }
}
