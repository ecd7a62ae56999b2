use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use tokio::signal::ctrl_c;
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{
    actions::{connect, import_ingredients, install_schema},
    config::Config,
    error::FoodgramError,
    form::IngredientForm,
    jwt::SessionKey,
    routes::{routes, Context},
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API (default)
    Serve,

    /// Load a JSON array of {"name", "measurement_unit"} objects into the ingredient catalog
    LoadIngredients { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), FoodgramError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = Config::load()?;

    let pool = connect(&config).await?;
    install_schema(&pool).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::LoadIngredients { path } => load_ingredients(path, &pool).await,
    }
}

async fn serve(config: Config, pool: sqlx::PgPool) -> Result<(), FoodgramError> {
    let ctx = Context {
        pool,
        key: SessionKey::new(&config.jwt_secret)?,
        page_size: config.page_size,
    };

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (address, server) = warp::serve(routes(ctx))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())
        .map_err(|e| FoodgramError::Internal(format!("Failed to bind {address}: {e}")))?;

    log::info!("Server running on {address}");
    server.await;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    match ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl+C, shutting down"),
        Err(e) => log::error!("Failed to listen for Ctrl+C: {e}"),
    }
}

async fn load_ingredients(path: PathBuf, pool: &sqlx::PgPool) -> Result<(), FoodgramError> {
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        log::error!("Failed to read {}: {e}", path.display());
        FoodgramError::Internal(format!("{e}"))
    })?;

    let forms: Vec<IngredientForm> = serde_json::from_str(&content)
        .map_err(|e| FoodgramError::Validation(format!("{}: {e}", path.display())))?;

    let inserted = import_ingredients(forms, pool).await?;
    log::info!("Loaded {inserted} ingredients from {}", path.display());
    Ok(())
}
