use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    filter::RecipeFilter,
    form::RecipeForm,
    jwt::SessionData,
    pagination::{Page, Pagination},
    schema::{Recipe, RecipeDetail, RecipeRow, User, UserProfile, Uuid},
};

use super::{
    list_recipe_parts, list_recipe_tags, list_users_by_id, related_recipes, subscribed_authors,
    RecipeRelation,
};

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, FoodgramError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a recipe the session is allowed to modify: its own, or any for admins
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, FoodgramError> {
    match get_recipe(id, pool).await? {
        Some(recipe) => {
            session.authenticate_owner(
                recipe.author_id,
                ActionType::ManageOwnRecipes,
                ActionType::ManageAllRecipes,
            )?;
            Ok(recipe)
        }
        None => Err(FoodgramError::not_found("Recipe")),
    }
}

/// Inserts tag links and ingredient lines of `form` for `recipe_id`.
/// Every referenced tag and ingredient has to exist.
async fn insert_recipe_parts(
    recipe_id: Uuid,
    form: &RecipeForm,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), FoodgramError> {
    let tag_ids = form.tag_ids();
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&tag_ids)
        .fetch_all(&mut **tr)
        .await?;
    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();
    if let Some(missing) = tag_ids.iter().find(|id| !found.contains(id)) {
        return Err(FoodgramError::NotFound(format!("Tag {missing} not found")));
    }

    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::int4[])")
        .bind(recipe_id)
        .bind(&tag_ids)
        .execute(&mut **tr)
        .await?;

    let ingredient_ids = form.ingredient_ids();
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids)
        .fetch_all(&mut **tr)
        .await?;
    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();
    if let Some(missing) = ingredient_ids.iter().find(|id| !found.contains(id)) {
        return Err(FoodgramError::NotFound(format!(
            "Ingredient {missing} not found"
        )));
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(form.ingredients.iter(), |mut row, part| {
        row.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });
    builder.build().execute(&mut **tr).await?;

    Ok(())
}

/// Creates a recipe with its tags and ingredient lines in one transaction
pub async fn create_recipe(
    form: RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, FoodgramError> {
    session.authenticate(ActionType::CreateRecipes)?;
    form.validate(true)?;

    let mut tr = pool.begin().await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(form.name.trim())
    .bind(&form.text)
    .bind(form.image.as_deref().unwrap_or_default())
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_recipe_parts(recipe.id, &form, &mut tr).await?;

    tr.commit().await?;

    log::info!("Recipe {} created by {}", recipe.id, session.username);
    fetch_recipe_detail(recipe, Some(session.user_id), pool).await
}

/// Replaces a recipe's fields, tags and ingredient lines in one transaction.
/// A missing image keeps the stored one.
pub async fn update_recipe(
    id: Uuid,
    form: RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, FoodgramError> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    form.validate(false)?;

    let mut tr = pool.begin().await?;

    let recipe: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET name = $1, text = $2, image = COALESCE($3, image), cooking_time = $4
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(form.name.trim())
    .bind(&form.text)
    .bind(form.image.as_deref())
    .bind(form.cooking_time)
    .bind(recipe.id)
    .fetch_one(&mut *tr)
    .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    insert_recipe_parts(recipe.id, &form, &mut tr).await?;

    tr.commit().await?;

    log::info!("Recipe {} updated by {}", recipe.id, session.username);
    fetch_recipe_detail(recipe, Some(session.user_id), pool).await
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await?;

    log::info!("Recipe {} deleted by {}", recipe.id, session.username);
    Ok(())
}

pub async fn fetch_recipe(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, FoodgramError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Recipe"))?;

    fetch_recipe_detail(recipe, viewer, pool).await
}

async fn fetch_recipe_detail(
    recipe: Recipe,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, FoodgramError> {
    build_recipe_details(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| FoodgramError::Internal(String::from("Recipe vanished")))
}

/// Lists recipes newest first. Every constraint present in `filter` narrows the result.
pub async fn fetch_recipes(
    filter: RecipeFilter,
    pagination: Pagination,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeDetail>, FoodgramError> {
    // Anonymous callers have no favorites and no cart
    if filter.requires_viewer() && viewer.is_none() {
        return Page::from_rows(vec![], 0, pagination);
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    for slug in filter.tags.iter() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ",
            )
            .push_bind(slug.to_owned())
            .push(")");
    }

    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let rows: Vec<RecipeRow> = builder.build_query_as::<RecipeRow>().fetch_all(pool).await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();
    let details = build_recipe_details(recipes, viewer, pool).await?;

    Page::from_rows(details, total_count, pagination)
}

/// Resolves authors, tags, ingredient lines and the viewer's flags for a batch of recipes
async fn build_recipe_details(
    recipes: Vec<Recipe>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, FoodgramError> {
    let recipe_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Uuid, User> = list_users_by_id(pool, &author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let subscribed = subscribed_authors(viewer, &author_ids, pool).await?;
    let mut tags = list_recipe_tags(&recipe_ids, pool).await?;
    let mut parts = list_recipe_parts(&recipe_ids, pool).await?;
    let favorited = related_recipes(RecipeRelation::Favorite, viewer, &recipe_ids, pool).await?;
    let in_cart = related_recipes(RecipeRelation::ShoppingCart, viewer, &recipe_ids, pool).await?;

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                FoodgramError::Internal(format!("Author of recipe {} is missing", recipe.id))
            })?;

            Ok(RecipeDetail {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author: UserProfile::from_user(author, subscribed.contains(&recipe.author_id)),
                ingredients: parts.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date,
            })
        })
        .collect()
}
