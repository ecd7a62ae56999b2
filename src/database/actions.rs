mod ingredients;
mod recipes;
mod relations;
mod subscriptions;
mod tags;
mod users;

pub use ingredients::*;
pub use recipes::*;
pub use relations::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use crate::{config::Config, error::FoodgramError};

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, FoodgramError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!(
        "Connected to database with up to {} connections",
        config.max_connections
    );
    Ok(pool)
}

/// Creates missing tables, constraints and indexes. Safe to run on every start.
pub async fn install_schema(pool: &Pool<Postgres>) -> Result<(), FoodgramError> {
    pool.execute(include_str!("schema.sql")).await?;

    log::info!("Database schema installed");
    Ok(())
}
