use std::convert::Infallible;

use serde::de::DeserializeOwned;
use sqlx::{Pool, Postgres};
use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::RecipeRelation,
    constants::MAX_BODY_SIZE,
    jwt::SessionKey,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
};

use super::{handlers, reply::handle_rejection};

/// State shared by every request
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub key: SessionKey,
    pub page_size: i64,
}

fn with_context(ctx: &Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    let ctx = ctx.clone();
    warp::any().map(move || ctx.clone())
}

fn with_relation(
    relation: RecipeRelation,
) -> impl Filter<Extract = (RecipeRelation,), Error = Infallible> + Clone {
    warp::any().map(move || relation)
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn query() -> impl Filter<Extract = (Vec<(String, String)>,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>()
}

fn put_or_patch() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::put().or(warp::patch()).unify()
}

fn tag_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(query())
        .and(with_context(ctx))
        .and_then(handlers::list_tags);

    let retrieve = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(handlers::retrieve_tag);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::create_tag);

    let update = warp::path!("tags" / Uuid)
        .and(put_or_patch())
        .and(with_session(ctx.key.clone()))
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::update_tag);

    let delete = warp::path!("tags" / Uuid)
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::delete_tag);

    list.or(retrieve)
        .unify()
        .or(create)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn ingredient_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(query())
        .and(with_context(ctx))
        .and_then(handlers::list_ingredients);

    let retrieve = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(handlers::retrieve_ingredient);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::create_ingredient);

    let delete = warp::path!("ingredients" / Uuid)
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::delete_ingredient);

    list.or(retrieve)
        .unify()
        .or(create)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn relation_routes(
    ctx: &Context,
    segment: &'static str,
    relation: RecipeRelation,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(with_relation(relation))
        .and(with_context(ctx))
        .and_then(handlers::add_relation);

    let remove = path
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_relation(relation))
        .and(with_context(ctx))
        .and_then(handlers::remove_relation);

    add.or(remove).unify().boxed()
}

fn recipe_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(query())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::list_recipes);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::download_shopping_cart);

    let retrieve = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::retrieve_recipe);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::create_recipe);

    let update = warp::path!("recipes" / Uuid)
        .and(put_or_patch())
        .and(with_session(ctx.key.clone()))
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::delete_recipe);

    list.or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(create)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(relation_routes(ctx, "favorite", RecipeRelation::Favorite))
        .unify()
        .or(relation_routes(ctx, "shopping_cart", RecipeRelation::ShoppingCart))
        .unify()
        .boxed()
}

fn user_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(query())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::register_user);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::me);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body())
        .and(with_context(ctx))
        .and_then(handlers::set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(query())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::list_subscriptions);

    let retrieve = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::retrieve_user);

    let delete = warp::path!("users" / Uuid)
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::delete_user);

    let subscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(query())
        .and(with_context(ctx))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(handlers::unsubscribe);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(retrieve)
        .unify()
        .or(delete)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

/// Every endpoint under `/api`, with rejections recovered into JSON error bodies
pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = tag_routes(&ctx)
        .or(ingredient_routes(&ctx))
        .unify()
        .or(recipe_routes(&ctx))
        .unify()
        .or(user_routes(&ctx))
        .unify();

    warp::path("api")
        .and(api)
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram"))
}
