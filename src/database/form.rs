use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::Deserialize;

use super::{error::FoodgramError, schema::Uuid};
use crate::constants::{
    EMAIL_MAX_LENGTH, MIN_AMOUNT, MIN_COOKING_TIME, NAME_MAX_LENGTH, PERSON_NAME_MAX_LENGTH,
    SLUG_MAX_LENGTH, USERNAME_MAX_LENGTH,
};

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));
static COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color pattern"));
static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));
static IMAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/]+={0,2}$")
        .expect("valid image pattern")
});

/// Usernames that would shadow fixed routes
const RESERVED_USERNAMES: &[&str] = &["me", "subscriptions"];

fn check_text(field: &str, value: &str, max_length: usize) -> Result<(), FoodgramError> {
    if value.trim().is_empty() {
        return Err(FoodgramError::Validation(format!("{field} may not be blank")));
    }
    if value.chars().count() > max_length {
        return Err(FoodgramError::Validation(format!(
            "{field} may not be longer than {max_length} characters"
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), FoodgramError> {
    check_text("username", username, USERNAME_MAX_LENGTH)?;
    if !USERNAME_PATTERN.is_match(username) {
        return Err(FoodgramError::validation(
            "Enter a valid username. This value may contain only letters, numbers and @/./+/-/_ characters",
        ));
    }
    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(FoodgramError::Validation(format!(
            "Username '{username}' is reserved"
        )));
    }
    Ok(())
}

pub fn validate_image(image: &str) -> Result<(), FoodgramError> {
    if !IMAGE_PATTERN.is_match(image) {
        return Err(FoodgramError::validation(
            "Image must be a base64 encoded data URI",
        ));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), FoodgramError> {
        check_text("email", &self.email, EMAIL_MAX_LENGTH)?;
        if !EMAIL_PATTERN.is_match(&self.email) {
            return Err(FoodgramError::validation("Enter a valid email address"));
        }
        validate_username(&self.username)?;
        check_text("first_name", &self.first_name, PERSON_NAME_MAX_LENGTH)?;
        check_text("last_name", &self.last_name, PERSON_NAME_MAX_LENGTH)?;
        if self.password.is_empty() {
            return Err(FoodgramError::validation("password may not be blank"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PasswordChange {
    pub new_password: String,
    pub current_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), FoodgramError> {
        if self.new_password.is_empty() {
            return Err(FoodgramError::validation("new_password may not be blank"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagForm {
    pub fn validate(&self) -> Result<(), FoodgramError> {
        check_text("name", &self.name, NAME_MAX_LENGTH)?;
        if !COLOR_PATTERN.is_match(&self.color) {
            return Err(FoodgramError::validation(
                "color must be a hex code such as #E26C2D",
            ));
        }
        check_text("slug", &self.slug, SLUG_MAX_LENGTH)?;
        if !SLUG_PATTERN.is_match(&self.slug) {
            return Err(FoodgramError::validation(
                "slug may contain only letters, numbers, underscores or hyphens",
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientForm {
    pub fn validate(&self) -> Result<(), FoodgramError> {
        check_text("name", &self.name, NAME_MAX_LENGTH)?;
        check_text("measurement_unit", &self.measurement_unit, NAME_MAX_LENGTH)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Payload of recipe creation and update. `image` may be omitted on update,
/// in which case the stored image is kept.
#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeForm {
    pub fn validate(&self, require_image: bool) -> Result<(), FoodgramError> {
        check_text("name", &self.name, NAME_MAX_LENGTH)?;
        if self.text.trim().is_empty() {
            return Err(FoodgramError::validation("text may not be blank"));
        }
        if self.cooking_time < MIN_COOKING_TIME {
            return Err(FoodgramError::Validation(format!(
                "cooking_time must be at least {MIN_COOKING_TIME}"
            )));
        }

        match &self.image {
            Some(image) => validate_image(image)?,
            None if require_image => {
                return Err(FoodgramError::validation("image is required"));
            }
            None => {}
        }

        if self.tags.is_empty() {
            return Err(FoodgramError::validation("At least one tag is required"));
        }
        if self.ingredients.is_empty() {
            return Err(FoodgramError::validation(
                "At least one ingredient is required",
            ));
        }

        let mut seen = HashSet::new();
        for part in self.ingredients.iter() {
            if part.amount < MIN_AMOUNT {
                return Err(FoodgramError::Validation(format!(
                    "amount must be at least {MIN_AMOUNT}"
                )));
            }
            if !seen.insert(part.id) {
                return Err(FoodgramError::Validation(format!(
                    "Ingredient {} is listed more than once",
                    part.id
                )));
            }
        }

        Ok(())
    }

    /// Tag ids in submission order with repeats collapsed
    pub fn tag_ids(&self) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.tags
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn ingredient_ids(&self) -> Vec<Uuid> {
        self.ingredients.iter().map(|part| part.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABAgMAAABieywaAAAACVBMVEUAAAD";

    fn recipe() -> RecipeForm {
        RecipeForm {
            ingredients: vec![
                IngredientAmount { id: 1, amount: 10 },
                IngredientAmount { id: 2, amount: 1 },
            ],
            tags: vec![3, 1, 3],
            image: Some(IMAGE.to_string()),
            name: String::from("Borscht"),
            text: String::from("Boil everything."),
            cooking_time: 90,
        }
    }

    #[test]
    fn accepts_valid_recipe() {
        assert_eq!(recipe().validate(true), Ok(()));
    }

    #[test]
    fn rejects_short_cooking_time() {
        let mut form = recipe();
        form.cooking_time = 0;
        assert!(matches!(form.validate(true), Err(FoodgramError::Validation(_))));
    }

    #[test]
    fn rejects_zero_amount() {
        let mut form = recipe();
        form.ingredients[1].amount = 0;
        assert!(matches!(form.validate(true), Err(FoodgramError::Validation(_))));
    }

    #[test]
    fn rejects_repeated_ingredient() {
        let mut form = recipe();
        form.ingredients.push(IngredientAmount { id: 1, amount: 3 });
        assert!(matches!(form.validate(true), Err(FoodgramError::Validation(_))));
    }

    #[test]
    fn image_is_optional_only_on_update() {
        let mut form = recipe();
        form.image = None;
        assert!(form.validate(true).is_err());
        assert!(form.validate(false).is_ok());
    }

    #[test]
    fn rejects_malformed_image() {
        let mut form = recipe();
        form.image = Some(String::from("https://example.org/cat.png"));
        assert!(form.validate(false).is_err());
    }

    #[test]
    fn collapses_repeated_tags() {
        assert_eq!(recipe().tag_ids(), vec![3, 1]);
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("chef.anna+1@home").is_ok());
        assert!(validate_username("Пётр_2").is_ok());
        assert!(validate_username("no spaces").is_err());
        assert!(validate_username("me").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
        assert!(validate_username(&"a".repeat(30)).is_ok());
    }

    #[test]
    fn tag_color_must_be_hex() {
        let mut form = TagForm {
            name: String::from("Breakfast"),
            color: String::from("#E26C2D"),
            slug: String::from("breakfast"),
        };
        assert!(form.validate().is_ok());

        form.color = String::from("orange");
        assert!(form.validate().is_err());
    }

    #[test]
    fn new_user_requires_valid_email() {
        let mut form = NewUser {
            email: String::from("anna@example.org"),
            username: String::from("anna"),
            first_name: String::from("Anna"),
            last_name: String::from("Ivanova"),
            password: String::from("correct horse"),
        };
        assert!(form.validate().is_ok());

        form.email = String::from("anna.example.org");
        assert!(form.validate().is_err());
    }
}
