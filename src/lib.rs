mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod api {
    pub mod handlers;
    pub mod rejection;
    pub mod routes;
}
pub mod config;
pub mod constants;
pub mod context;
pub mod logging;

pub use api::*;
pub use authentication::*;
pub use constants::*;
pub use database::*;
