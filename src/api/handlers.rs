use warp::{http::StatusCode, reject::Rejection, reply::Response};

use crate::{
    actions::{self, RecipeRelation},
    constants::{DEFAULT_RECIPES_LIMIT, SHOPPING_LIST_FILENAME},
    error::FoodgramError,
    filter::{recipes_limit, search_prefix, RecipeFilter},
    form::{IngredientForm, NewUser, PasswordChange, RecipeForm, TagForm},
    jwt::SessionData,
    pagination::Pagination,
    schema::Uuid,
    shopping,
};

use super::{reply, routes::Context};

type Params = Vec<(String, String)>;

fn viewer(session: &Option<SessionData>) -> Option<Uuid> {
    session.as_ref().map(|session| session.user_id)
}

// Tags

pub async fn list_tags(params: Params, ctx: Context) -> Result<Response, Rejection> {
    let name = params
        .into_iter()
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value);

    let tags = actions::list_tags(name, &ctx.pool).await?;
    Ok(reply::json(&tags, StatusCode::OK))
}

pub async fn retrieve_tag(id: Uuid, ctx: Context) -> Result<Response, Rejection> {
    let tag = actions::get_tag(id, &ctx.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Tag"))?;

    Ok(reply::json(&tag, StatusCode::OK))
}

pub async fn create_tag(
    session: SessionData,
    form: TagForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    let tag = actions::create_tag(form, &session, &ctx.pool).await?;
    Ok(reply::json(&tag, StatusCode::CREATED))
}

pub async fn update_tag(
    id: Uuid,
    session: SessionData,
    form: TagForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    let tag = actions::update_tag(id, form, &session, &ctx.pool).await?;
    Ok(reply::json(&tag, StatusCode::OK))
}

pub async fn delete_tag(id: Uuid, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    actions::delete_tag(id, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

// Ingredients

pub async fn list_ingredients(params: Params, ctx: Context) -> Result<Response, Rejection> {
    let ingredients = actions::list_ingredients(search_prefix(&params), &ctx.pool).await?;
    Ok(reply::json(&ingredients, StatusCode::OK))
}

pub async fn retrieve_ingredient(id: Uuid, ctx: Context) -> Result<Response, Rejection> {
    let ingredient = actions::get_ingredient(id, &ctx.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Ingredient"))?;

    Ok(reply::json(&ingredient, StatusCode::OK))
}

pub async fn create_ingredient(
    session: SessionData,
    form: IngredientForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    let ingredient = actions::create_ingredient(form, &session, &ctx.pool).await?;
    Ok(reply::json(&ingredient, StatusCode::CREATED))
}

pub async fn delete_ingredient(
    id: Uuid,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    actions::delete_ingredient(id, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

// Recipes

pub async fn list_recipes(
    params: Params,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_query(&params)?;
    let pagination = Pagination::from_query(&params, ctx.page_size)?;

    let page = actions::fetch_recipes(filter, pagination, viewer(&session), &ctx.pool).await?;
    Ok(reply::json(&page, StatusCode::OK))
}

pub async fn retrieve_recipe(
    id: Uuid,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = actions::fetch_recipe(id, viewer(&session), &ctx.pool).await?;
    Ok(reply::json(&recipe, StatusCode::OK))
}

pub async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = actions::create_recipe(form, &session, &ctx.pool).await?;
    Ok(reply::json(&recipe, StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = actions::update_recipe(id, form, &session, &ctx.pool).await?;
    Ok(reply::json(&recipe, StatusCode::OK))
}

pub async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    actions::delete_recipe(id, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

pub async fn add_relation(
    id: Uuid,
    session: SessionData,
    relation: RecipeRelation,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = actions::add_relation(relation, id, &session, &ctx.pool).await?;
    Ok(reply::json(&recipe, StatusCode::CREATED))
}

pub async fn remove_relation(
    id: Uuid,
    session: SessionData,
    relation: RecipeRelation,
    ctx: Context,
) -> Result<Response, Rejection> {
    actions::remove_relation(relation, id, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    let items = actions::shopping_list(&session, &ctx.pool).await?;

    log::trace!("> Shopping list of {} with {} lines", session.user_id, items.len());
    Ok(reply::attachment(
        shopping::render(&items),
        SHOPPING_LIST_FILENAME,
    ))
}

// Users

pub async fn list_users(
    params: Params,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_query(&params, ctx.page_size)?;

    let page = actions::fetch_users(pagination, viewer(&session), &ctx.pool).await?;
    Ok(reply::json(&page, StatusCode::OK))
}

pub async fn register_user(form: NewUser, ctx: Context) -> Result<Response, Rejection> {
    let profile = actions::register_user(form, &ctx.pool).await?;
    Ok(reply::json(&profile, StatusCode::CREATED))
}

pub async fn retrieve_user(
    id: Uuid,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let profile = actions::get_profile(id, viewer(&session), &ctx.pool).await?;
    Ok(reply::json(&profile, StatusCode::OK))
}

pub async fn me(session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    let profile = actions::get_profile(session.user_id, Some(session.user_id), &ctx.pool).await?;
    Ok(reply::json(&profile, StatusCode::OK))
}

pub async fn set_password(
    session: SessionData,
    form: PasswordChange,
    ctx: Context,
) -> Result<Response, Rejection> {
    actions::change_password(form, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

pub async fn delete_user(id: Uuid, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    actions::delete_user(id, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

pub async fn subscribe(
    id: Uuid,
    session: SessionData,
    params: Params,
    ctx: Context,
) -> Result<Response, Rejection> {
    let limit = recipes_limit(&params, DEFAULT_RECIPES_LIMIT)?;

    let subscription = actions::subscribe(id, limit, &session, &ctx.pool).await?;
    Ok(reply::json(&subscription, StatusCode::CREATED))
}

pub async fn unsubscribe(id: Uuid, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    actions::unsubscribe(id, &session, &ctx.pool).await?;
    Ok(reply::no_content())
}

pub async fn list_subscriptions(
    params: Params,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_query(&params, ctx.page_size)?;
    let limit = recipes_limit(&params, DEFAULT_RECIPES_LIMIT)?;

    let page = actions::fetch_subscriptions(pagination, limit, &session, &ctx.pool).await?;
    Ok(reply::json(&page, StatusCode::OK))
}
