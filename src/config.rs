use std::{env, fmt::Display, str::FromStr};

use crate::{constants::DEFAULT_PAGE_SIZE, error::FoodgramError};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub page_size: i64,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> Result<Self, FoodgramError> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            jwt_secret: require("FOODGRAM_JWT_SECRET")?,
            port: try_load("FOODGRAM_PORT", "8000")?,
            page_size: try_load("FOODGRAM_PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())?,
            max_connections: try_load("FOODGRAM_MAX_CONNECTIONS", "5")?,
        })
    }
}

fn require(key: &str) -> Result<String, FoodgramError> {
    env::var(key).map_err(|_| {
        log::error!("Environment variable {key} is required");
        FoodgramError::Internal(format!("{key} is not set"))
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, FoodgramError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse_value(key, &value)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, FoodgramError>
where
    T::Err: Display,
{
    value.trim().parse().map_err(|e| {
        log::warn!("Invalid {key} value: {e}");
        FoodgramError::Internal(format!("Invalid {key} value: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_values() {
        let port: u16 = parse_value("FOODGRAM_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn rejects_malformed_values() {
        let port: Result<u16, _> = parse_value("FOODGRAM_PORT", "eighty");
        assert!(matches!(port, Err(FoodgramError::Internal(_))));
    }
}
