use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        permissions::ActionType,
    },
    error::FoodgramError,
    form::{NewUser, PasswordChange},
    jwt::SessionData,
    pagination::{Page, Pagination},
    schema::{User, UserProfile, UserRow, Uuid},
};

use super::subscriptions::{is_subscribed, subscribed_authors};

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, FoodgramError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn list_users_by_id(
    pool: &Pool<Postgres>,
    user_ids: &[Uuid],
) -> Result<Vec<User>, FoodgramError> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Creates a user, storing only the argon2 hash of the password
pub async fn register_user(form: NewUser, pool: &Pool<Postgres>) -> Result<UserProfile, FoodgramError> {
    form.validate()?;
    let password = hash_password(&form.password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(form.email.trim())
    .bind(&form.username)
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        FoodgramError::from(e)
            .duplicate_as_validation("A user with that username or email already exists")
    })?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(UserProfile::from_user(user, false))
}

pub async fn change_password(
    form: PasswordChange,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    session.authenticate(ActionType::ManageOwnAccount)?;
    form.validate()?;

    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or_else(|| FoodgramError::not_found("User"))?;

    if !verify_password(&form.current_password, &user.password)? {
        return Err(FoodgramError::validation("Current password is incorrect"));
    }

    let password = hash_password(&form.new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, FoodgramError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| FoodgramError::not_found("User"))?;

    let subscribed = match viewer {
        Some(viewer) => is_subscribed(viewer, user.id, pool).await?,
        None => false,
    };

    Ok(UserProfile::from_user(user, subscribed))
}

pub async fn fetch_users(
    pagination: Pagination,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Page<UserProfile>, FoodgramError> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2")
            .bind(pagination.limit)
            .bind(pagination.offset())
            .fetch_all(pool)
            .await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let subscribed = subscribed_authors(viewer, &ids, pool).await?;

    let page = Page::from_rows(rows, total_count, pagination)?.map(|row| {
        let is_subscribed = subscribed.contains(&row.id);
        UserProfile::from_user(row.into(), is_subscribed)
    });
    Ok(page)
}

/// Deletes a user. Their recipes, relations and subscriptions cascade.
pub async fn delete_user(
    user_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    session.authenticate(ActionType::ManageUsers)?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("User"));
    }

    log::info!("User {user_id} deleted by {}", session.username);
    Ok(())
}
