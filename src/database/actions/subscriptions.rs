use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    jwt::SessionData,
    pagination::{Page, Pagination},
    schema::{RecipeShort, Subscription, User, UserProfile, UserRow, Uuid},
};

use super::get_user_by_id;

#[derive(sqlx::FromRow)]
struct AuthorRecipe {
    author_id: Uuid,
    id: Uuid,
    name: String,
    image: String,
    cooking_time: i32,
}

pub async fn is_subscribed(
    subscriber_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, FoodgramError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2",
    )
    .bind(subscriber_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    Ok(result.is_some())
}

/// Authors among `author_ids` followed by `viewer`, empty for anonymous callers
pub async fn subscribed_authors(
    viewer: Option<Uuid>,
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, FoodgramError> {
    let viewer = match viewer {
        Some(viewer) if !author_ids.is_empty() => viewer,
        _ => return Ok(HashSet::new()),
    };

    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE subscriber_id = $1 AND author_id = ANY($2)",
    )
    .bind(viewer)
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Newest recipes of each author (at most `recipes_limit`) and their total recipe counts
async fn author_recipes(
    author_ids: &[Uuid],
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<(HashMap<Uuid, Vec<RecipeShort>>, HashMap<Uuid, i64>), FoodgramError> {
    if author_ids.is_empty() {
        return Ok((HashMap::new(), HashMap::new()));
    }

    let previews: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS author_rank
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE author_rank <= $2
        ORDER BY author_id, author_rank
    ",
    )
    .bind(author_ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await?;

    let counts: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    let mut recipes: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    for preview in previews.into_iter() {
        recipes
            .entry(preview.author_id)
            .or_default()
            .push(RecipeShort {
                id: preview.id,
                name: preview.name,
                image: preview.image,
                cooking_time: preview.cooking_time,
            });
    }

    Ok((recipes, counts.into_iter().collect()))
}

async fn build_subscriptions(
    authors: Vec<User>,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, FoodgramError> {
    let ids: Vec<Uuid> = authors.iter().map(|author| author.id).collect();
    let (mut recipes, counts) = author_recipes(&ids, recipes_limit, pool).await?;

    Ok(authors
        .into_iter()
        .map(|author| Subscription {
            recipes: recipes.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author: UserProfile::from_user(author, true),
        })
        .collect())
}

/// Follows `author_id`. Self-subscription is rejected before any query runs.
pub async fn subscribe(
    author_id: Uuid,
    recipes_limit: i64,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Subscription, FoodgramError> {
    if author_id == session.user_id {
        return Err(FoodgramError::InvalidSelfReference);
    }
    session.authenticate(ActionType::ManageOwnRelations)?;

    let author = get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(|| FoodgramError::not_found("User"))?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::Duplicate(String::from(
            "You are already subscribed to this author",
        )));
    }

    log::trace!("> {} subscribed to {}", session.user_id, author.id);

    build_subscriptions(vec![author], recipes_limit, pool)
        .await?
        .pop()
        .ok_or_else(|| FoodgramError::Internal(String::from("Subscription vanished")))
}

pub async fn unsubscribe(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    if author_id == session.user_id {
        return Err(FoodgramError::InvalidSelfReference);
    }
    session.authenticate(ActionType::ManageOwnRelations)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(FoodgramError::not_found("User"));
    }

    let result =
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
            .bind(session.user_id)
            .bind(author_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::MissingRelation(String::from(
            "You are not subscribed to this author",
        )));
    }

    Ok(())
}

pub async fn fetch_subscriptions(
    pagination: Pagination,
    recipes_limit: i64,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, FoodgramError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.subscriber_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let authors: Vec<User> = rows.into_iter().map(User::from).collect();
    let subscriptions = build_subscriptions(authors, recipes_limit, pool).await?;

    Page::from_rows(subscriptions, total_count, pagination)
}
