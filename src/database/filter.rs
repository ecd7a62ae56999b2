use super::{error::FoodgramError, schema::Uuid};

/// Recipe list constraints. Each field narrows the result independently,
/// `None`/empty means no constraint from that parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    /// Tag slugs, a recipe has to carry every one of them
    pub tags: Vec<String>,
}

impl RecipeFilter {
    pub fn from_query(params: &[(String, String)]) -> Result<Self, FoodgramError> {
        let mut filter = Self::default();

        for (key, value) in params.iter() {
            match key.as_str() {
                "author" => {
                    let author = value
                        .parse::<Uuid>()
                        .map_err(|_| FoodgramError::validation("author must be a user id"))?;
                    filter.author = Some(author);
                }
                "is_favorited" => filter.is_favorited = parse_flag(key, value)?,
                "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_flag(key, value)?,
                "tags" => {
                    if !value.is_empty() && !filter.tags.contains(value) {
                        filter.tags.push(value.to_owned());
                    }
                }
                _ => {}
            }
        }

        Ok(filter)
    }

    /// Whether the filter can only match relations of an authenticated caller
    pub fn requires_viewer(&self) -> bool {
        self.is_favorited || self.is_in_shopping_cart
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, FoodgramError> {
    match value {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        _ => Err(FoodgramError::Validation(format!(
            "{key} must be one of 0, 1, true, false"
        ))),
    }
}

/// Reads `recipes_limit` for subscription previews
pub fn recipes_limit(params: &[(String, String)], default: i64) -> Result<i64, FoodgramError> {
    match params.iter().find(|(key, _)| key == "recipes_limit") {
        Some((_, value)) => value
            .parse::<i64>()
            .ok()
            .filter(|limit| *limit >= 0)
            .ok_or_else(|| FoodgramError::validation("recipes_limit must be a non-negative integer")),
        None => Ok(default),
    }
}

/// Reads the ingredient name prefix from `search` (or `name`)
pub fn search_prefix(params: &[(String, String)]) -> Option<String> {
    params
        .iter()
        .find(|(key, _)| key == "search" || key == "name")
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Escapes LIKE wildcards so user input only matches literally
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_query_has_no_constraints() {
        let filter = RecipeFilter::from_query(&[]).unwrap();
        assert_eq!(filter, RecipeFilter::default());
        assert!(!filter.requires_viewer());
    }

    #[test]
    fn collects_repeated_tags() {
        let filter = RecipeFilter::from_query(&params(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("tags", "breakfast"),
            ("page", "2"),
        ]))
        .unwrap();
        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
    }

    #[test]
    fn parses_flags_and_author() {
        let filter = RecipeFilter::from_query(&params(&[
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "false"),
            ("author", "7"),
        ]))
        .unwrap();
        assert_eq!(
            filter,
            RecipeFilter {
                author: Some(7),
                is_favorited: true,
                is_in_shopping_cart: false,
                tags: vec![],
            }
        );
        assert!(filter.requires_viewer());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(RecipeFilter::from_query(&params(&[("author", "me")])).is_err());
        assert!(RecipeFilter::from_query(&params(&[("is_favorited", "yes")])).is_err());
    }

    #[test]
    fn reads_recipes_limit() {
        assert_eq!(recipes_limit(&[], 3).unwrap(), 3);
        assert_eq!(recipes_limit(&params(&[("recipes_limit", "0")]), 3).unwrap(), 0);
        assert!(recipes_limit(&params(&[("recipes_limit", "-1")]), 3).is_err());
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(search_prefix(&params(&[("search", "  sal ")])), Some(String::from("sal")));
        assert_eq!(search_prefix(&params(&[("search", "")])), None);
    }
}
