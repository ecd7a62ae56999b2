use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    filter::escape_like,
    form::IngredientForm,
    jwt::SessionData,
    schema::{Ingredient, RecipePart, Uuid},
};

const INGREDIENT_EXISTS: &str = "An ingredient with this name and measurement unit already exists";
const INGREDIENT_IN_USE: &str = "Ingredient is used by recipes and cannot be deleted";

/// Lists the catalog, optionally narrowed to names starting with `search` (case-insensitive)
pub async fn list_ingredients(
    search: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, FoodgramError> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as(
                "SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) || '%' ESCAPE '\\' ORDER BY name, id",
            )
            .bind(escape_like(&search))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, FoodgramError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn create_ingredient(
    form: IngredientForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, FoodgramError> {
    session.authenticate(ActionType::CreateIngredients)?;
    form.validate()?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.measurement_unit.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| FoodgramError::from(e).duplicate_as_validation(INGREDIENT_EXISTS))?;

    Ok(ingredient)
}

/// Deletes an ingredient that no recipe references
pub async fn delete_ingredient(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    session.authenticate(ActionType::ManageIngredients)?;

    let mut tr = pool.begin().await?;

    let (in_use,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM recipe_ingredients WHERE ingredient_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *tr)
    .await?;

    if in_use {
        return Err(FoodgramError::validation(INGREDIENT_IN_USE));
    }

    // RESTRICT still guards against a recipe referencing it concurrently
    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| match FoodgramError::from(e) {
            FoodgramError::NotFound(_) => FoodgramError::validation(INGREDIENT_IN_USE),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("Ingredient"));
    }

    tr.commit().await?;
    Ok(())
}

/// Loads catalog entries, skipping pairs that already exist. Returns the number of new rows.
pub async fn import_ingredients(
    forms: Vec<IngredientForm>,
    pool: &Pool<Postgres>,
) -> Result<u64, FoodgramError> {
    for form in forms.iter() {
        form.validate()?;
    }

    let mut tr = pool.begin().await?;
    let mut inserted = 0;

    for form in forms.iter() {
        let result = sqlx::query(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(form.name.trim())
        .bind(form.measurement_unit.trim())
        .execute(&mut *tr)
        .await?;

        inserted += result.rows_affected();
    }

    tr.commit().await?;

    log::info!(
        "Imported {inserted} new ingredients ({} skipped)",
        forms.len() as u64 - inserted
    );
    Ok(inserted)
}

/// Ingredient lines of every recipe in `recipe_ids`, keyed by recipe
pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipePart>>, FoodgramError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row);
    });

    Ok(hashmap)
}
