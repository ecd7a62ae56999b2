use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    form::TagForm,
    jwt::SessionData,
    schema::{LinkedRecipeTag, Tag, Uuid},
};

use sqlx::{Pool, Postgres};

const TAG_EXISTS: &str = "A tag with this name, color or slug already exists";

pub async fn create_tag(
    form: TagForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Tag, FoodgramError> {
    session.authenticate(ActionType::ManageTags)?;
    form.validate()?;

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(form.name.trim())
            .bind(&form.color)
            .bind(&form.slug)
            .fetch_one(pool)
            .await
            .map_err(|e| FoodgramError::from(e).duplicate_as_validation(TAG_EXISTS))?;

    log::info!("Tag {} created by {}", tag.slug, session.username);
    Ok(tag)
}

pub async fn update_tag(
    id: Uuid,
    form: TagForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Tag, FoodgramError> {
    session.authenticate(ActionType::ManageTags)?;
    form.validate()?;

    let tag: Option<Tag> = sqlx::query_as(
        "UPDATE tags SET name = $1, color = $2, slug = $3 WHERE id = $4 RETURNING *",
    )
    .bind(form.name.trim())
    .bind(&form.color)
    .bind(&form.slug)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| FoodgramError::from(e).duplicate_as_validation(TAG_EXISTS))?;

    tag.ok_or_else(|| FoodgramError::not_found("Tag"))
}

pub async fn delete_tag(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    session.authenticate(ActionType::ManageTags)?;

    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("Tag"));
    }
    Ok(())
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, FoodgramError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(name: Option<String>, pool: &Pool<Postgres>) -> Result<Vec<Tag>, FoodgramError> {
    let list: Vec<Tag> = match name {
        Some(name) => {
            sqlx::query_as("SELECT * FROM tags WHERE name = $1 ORDER BY id")
                .bind(name)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM tags ORDER BY id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(list)
}

/// Tags of every recipe in `recipe_ids`, keyed by recipe
pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<Tag>>, FoodgramError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row.into());
    });

    Ok(hashmap)
}
