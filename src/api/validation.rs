use regex::Regex;
use std::sync::OnceLock;

use super::ApiError;
use crate::constants::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::constants::users::{MAX_EMAIL_LENGTH, MAX_NAME_LENGTH};

static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_REGEX.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Invalid regex"))
}

fn email_regex() -> &'static Regex {
    EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            resource, id
        )));
    }
    Ok(id)
}

pub fn validate_page(page: Option<u64>) -> Result<u64, ApiError> {
    match page {
        None => Ok(1),
        Some(0) => Err(ApiError::field("page", "Page numbers start at 1")),
        Some(page) => Ok(page),
    }
}

pub fn validate_page_size(limit: Option<u64>) -> Result<u64, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::field(
            "limit",
            format!(
                "Invalid limit: {}. Limit must be between 1 and {}",
                limit, MAX_PAGE_SIZE
            ),
        ));
    }
    Ok(limit)
}

/// Accepts `1`/`true` and `0`/`false`.
pub fn parse_flag(field: &str, value: &str) -> Result<bool, ApiError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(ApiError::field(
            field,
            format!("Expected 0 or 1, got '{}'", other),
        )),
    }
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if username.is_empty() {
        return Err(ApiError::field("username", "Username is required"));
    }

    if username.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::field(
            "username",
            format!("Username must be {} characters or less", MAX_NAME_LENGTH),
        ));
    }

    if !username_regex().is_match(username) {
        return Err(ApiError::field(
            "username",
            "Username can only contain letters, digits and @/./+/-/_",
        ));
    }

    Ok(username)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if email.is_empty() {
        return Err(ApiError::field("email", "Email is required"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::field(
            "email",
            format!("Email must be {} characters or less", MAX_EMAIL_LENGTH),
        ));
    }

    if !email_regex().is_match(email) {
        return Err(ApiError::field("email", "Enter a valid email address"));
    }

    Ok(email)
}

pub fn validate_person_name<'a>(field: &str, name: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::field(field, "This field may not be blank"));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::field(
            field,
            format!("Must be {} characters or less", MAX_NAME_LENGTH),
        ));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("recipe", 1).is_ok());
        assert!(validate_id("recipe", 0).is_err());
        assert!(validate_id("recipe", -1).is_err());
    }

    #[test]
    fn test_validate_page_size() {
        assert_eq!(validate_page_size(None).unwrap(), 6);
        assert_eq!(validate_page_size(Some(100)).unwrap(), 100);
        assert!(validate_page_size(Some(0)).is_err());
        assert!(validate_page_size(Some(101)).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert_eq!(validate_page(Some(3)).unwrap(), 3);
        assert!(validate_page(Some(0)).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("is_favorited", "1").unwrap());
        assert!(!parse_flag("is_favorited", "false").unwrap());
        assert!(parse_flag("is_favorited", "yes").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("chef.anna+1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("cook@example.com").is_ok());
        assert!(validate_email("cook@example").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
    }

    #[test]
    fn test_validate_person_name() {
        assert_eq!(validate_person_name("first_name", "  Anna ").unwrap(), "Anna");
        assert!(validate_person_name("first_name", "   ").is_err());
    }
}
