//! Validation of nested recipe write payloads.
//!
//! A [`RecipeInput`] is whatever the client sent; [`RecipeInput::validate`]
//! turns it into a [`RecipeDraft`] whose invariants the repository relies on:
//! non-empty unique tag and ingredient sets, and amounts and cooking time
//! within [`MIN_AMOUNT`]..=[`MAX_AMOUNT`].

use serde::{Deserialize, Deserializer, de};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::recipe::{MAX_AMOUNT, MAX_NAME_LENGTH, MIN_AMOUNT};

/// A validation failure attached to a single payload field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

/// Accepts an integer either as a JSON number or as a numeric string.
fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NumberOrText::<T>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid integer {text:?}: {e}"))),
    }
}

/// Ingredient reference as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountInput {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i32,
    #[serde(deserialize_with = "lenient_int")]
    pub amount: i64,
}

/// Raw recipe payload used for both create and update.
///
/// Every field defaults so that a missing key is reported as a field-level
/// validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipeInput {
    pub ingredients: Vec<IngredientAmountInput>,
    pub tags: Vec<i32>,
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    #[serde(deserialize_with = "lenient_int")]
    pub cooking_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: i32,
    pub amount: i32,
}

/// A recipe payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i32>,
}

impl RecipeDraft {
    #[must_use]
    pub fn ingredient_ids(&self) -> Vec<i32> {
        self.ingredients.iter().map(|i| i.ingredient_id).collect()
    }
}

fn bounded_amount(value: i64, field: &'static str, what: &str) -> Result<i32, FieldError> {
    i32::try_from(value)
        .ok()
        .filter(|v| (MIN_AMOUNT..=MAX_AMOUNT).contains(v))
        .ok_or_else(|| {
            FieldError::new(
                field,
                format!("{what} must be between {MIN_AMOUNT} and {MAX_AMOUNT}, got {value}"),
            )
        })
}

impl RecipeInput {
    /// Checks the payload and returns the normalized draft.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldError`] found.
    pub fn validate(self) -> Result<RecipeDraft, FieldError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(FieldError::new("name", "Recipe name is required"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(FieldError::new(
                "name",
                format!("Recipe name must be {MAX_NAME_LENGTH} characters or less"),
            ));
        }

        if self.text.trim().is_empty() {
            return Err(FieldError::new("text", "Recipe text is required"));
        }

        let image = self
            .image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .ok_or_else(|| FieldError::new("image", "An image is required"))?;

        let cooking_time = bounded_amount(self.cooking_time, "cooking_time", "Cooking time")?;

        let tags = validate_tags(self.tags)?;
        let ingredients = validate_ingredients(self.ingredients)?;

        Ok(RecipeDraft {
            name,
            text: self.text,
            image,
            cooking_time,
            ingredients,
            tags,
        })
    }
}

fn validate_tags(tags: Vec<i32>) -> Result<Vec<i32>, FieldError> {
    if tags.is_empty() {
        return Err(FieldError::new("tags", "At least one tag is required"));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    for id in &tags {
        if !seen.insert(*id) {
            return Err(FieldError::new("tags", format!("Tag {id} is listed more than once")));
        }
    }

    Ok(tags)
}

fn validate_ingredients(
    ingredients: Vec<IngredientAmountInput>,
) -> Result<Vec<IngredientAmount>, FieldError> {
    if ingredients.is_empty() {
        return Err(FieldError::new(
            "ingredients",
            "At least one ingredient is required",
        ));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    let mut validated = Vec::with_capacity(ingredients.len());

    for item in ingredients {
        if !seen.insert(item.id) {
            return Err(FieldError::new(
                "ingredients",
                format!("Ingredient {} is listed more than once", item.id),
            ));
        }

        let amount = bounded_amount(item.amount, "amount", "Ingredient amount")?;
        validated.push(IngredientAmount {
            ingredient_id: item.id,
            amount,
        });
    }

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> RecipeInput {
        RecipeInput {
            ingredients: vec![
                IngredientAmountInput { id: 1, amount: 5 },
                IngredientAmountInput { id: 2, amount: 10 },
            ],
            tags: vec![1, 2],
            image: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
            name: "  Pancakes ".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
        }
    }

    #[test]
    fn accepts_valid_payload() {
        let draft = valid_input().validate().unwrap();
        assert_eq!(draft.name, "Pancakes");
        assert_eq!(draft.cooking_time, 20);
        assert_eq!(draft.ingredient_ids(), vec![1, 2]);
        assert_eq!(draft.tags, vec![1, 2]);
    }

    #[test]
    fn rejects_empty_tags_and_ingredients() {
        let mut input = valid_input();
        input.tags.clear();
        assert_eq!(input.validate().unwrap_err().field, "tags");

        let mut input = valid_input();
        input.ingredients.clear();
        assert_eq!(input.validate().unwrap_err().field, "ingredients");
    }

    #[test]
    fn rejects_duplicates() {
        let mut input = valid_input();
        input.tags = vec![3, 3];
        assert_eq!(input.validate().unwrap_err().field, "tags");

        let mut input = valid_input();
        input.ingredients.push(IngredientAmountInput { id: 1, amount: 7 });
        assert_eq!(input.validate().unwrap_err().field, "ingredients");
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        for (amount, ok) in [(0, false), (1, true), (32000, true), (32001, false), (-5, false)] {
            let mut input = valid_input();
            input.ingredients[0].amount = amount;
            let result = input.validate();
            assert_eq!(result.is_ok(), ok, "amount {amount}");
            if let Err(err) = result {
                assert_eq!(err.field, "amount");
            }
        }
    }

    #[test]
    fn cooking_time_bounds() {
        let mut input = valid_input();
        input.cooking_time = 0;
        assert_eq!(input.validate().unwrap_err().field, "cooking_time");

        let mut input = valid_input();
        input.cooking_time = i64::from(i32::MAX) + 1;
        assert_eq!(input.validate().unwrap_err().field, "cooking_time");

        let mut input = valid_input();
        input.cooking_time = 32000;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn requires_image_name_and_text() {
        let mut input = valid_input();
        input.image = Some("   ".to_string());
        assert_eq!(input.validate().unwrap_err().field, "image");

        let mut input = valid_input();
        input.image = None;
        assert_eq!(input.validate().unwrap_err().field, "image");

        let mut input = valid_input();
        input.name = String::new();
        assert_eq!(input.validate().unwrap_err().field, "name");

        let mut input = valid_input();
        input.name = "x".repeat(201);
        assert_eq!(input.validate().unwrap_err().field, "name");

        let mut input = valid_input();
        input.text = "\n".to_string();
        assert_eq!(input.validate().unwrap_err().field, "text");
    }

    #[test]
    fn missing_keys_deserialize_to_field_errors() {
        let input: RecipeInput = serde_json::from_str(r#"{"name": "Soup"}"#).unwrap();
        assert_eq!(input.validate().unwrap_err().field, "text");
    }

    #[test]
    fn numeric_strings_are_accepted_as_integers() {
        let input: RecipeInput = serde_json::from_str(
            r#"{"ingredients": [{"id": "3", "amount": " 5 "}], "cooking_time": "15"}"#,
        )
        .unwrap();
        assert_eq!(input.ingredients[0].id, 3);
        assert_eq!(input.ingredients[0].amount, 5);
        assert_eq!(input.cooking_time, 15);
        assert!(input.tags.is_empty());
    }

    #[test]
    fn non_integer_values_fail_to_parse() {
        for body in [
            r#"{"cooking_time": 1.5}"#,
            r#"{"cooking_time": "soon"}"#,
            r#"{"ingredients": [{"id": 1, "amount": "five"}]}"#,
            r#"{"tags": ["breakfast"]}"#,
        ] {
            assert!(serde_json::from_str::<RecipeInput>(body).is_err(), "{body}");
        }
    }
}
