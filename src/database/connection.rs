use std::str::FromStr;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::config::DatabaseConfig;

use super::error::QueryError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(config: &DatabaseConfig) -> Result<Pool<Sqlite>, QueryError> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    log::info!("connected to {}", config.url);
    Ok(pool)
}

/// Single-connection in-memory database; the connection is never recycled so
/// the data lives as long as the pool.
pub async fn connect_in_memory() -> Result<Pool<Sqlite>, QueryError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), QueryError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

    Ok(())
}
