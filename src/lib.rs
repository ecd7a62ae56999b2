mod database {
    pub mod actions;
    pub mod error;
    pub mod filter;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod shopping;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod api {
    pub mod handlers;
    pub mod reply;
    pub mod routes;
}
pub mod config;
mod constants;

pub use api::*;
pub use authentication::*;
pub use constants::*;
pub use database::*;
