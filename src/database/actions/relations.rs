use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    jwt::SessionData,
    schema::{CartPart, RecipeShort, Uuid},
    shopping::{aggregate, ShoppingItem},
};

use super::get_recipe;

/// User to recipe edges toggled through POST and DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeRelation {
    Favorite,
    ShoppingCart,
}

impl RecipeRelation {
    fn table(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "favorites",
            RecipeRelation::ShoppingCart => "shopping_cart",
        }
    }

    fn already_exists(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "Recipe is already in favorites",
            RecipeRelation::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn missing(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "Recipe is not in favorites",
            RecipeRelation::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

/// Recipes among `recipe_ids` linked to `viewer`, empty for anonymous callers
pub async fn related_recipes(
    relation: RecipeRelation,
    viewer: Option<Uuid>,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, FoodgramError> {
    let viewer = match viewer {
        Some(viewer) if !recipe_ids.is_empty() => viewer,
        _ => return Ok(HashSet::new()),
    };

    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        relation.table()
    ))
    .bind(viewer)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn add_relation(
    relation: RecipeRelation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, FoodgramError> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Recipe"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        relation.table()
    ))
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(|e| match FoodgramError::from(e) {
        FoodgramError::Duplicate(_) => FoodgramError::Duplicate(relation.already_exists().to_string()),
        other => other,
    })?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::Duplicate(relation.already_exists().to_string()));
    }

    log::trace!("> {relation:?} {} added by {}", recipe.id, session.user_id);
    Ok(RecipeShort::from(&recipe))
}

pub async fn remove_relation(
    relation: RecipeRelation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(FoodgramError::not_found("Recipe"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        relation.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::MissingRelation(relation.missing().to_string()));
    }

    Ok(())
}

/// Every ingredient line of every recipe in the user's cart, unaggregated
pub async fn list_cart_parts(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartPart>, FoodgramError> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingItem>, FoodgramError> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    let parts = list_cart_parts(session.user_id, pool).await?;
    Ok(aggregate(parts))
}
