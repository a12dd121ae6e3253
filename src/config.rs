//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with FOODGRAM__, sections split by `__`)
//! 2. Config file (foodgram.toml, optional)
//! 3. Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{RECIPES_LIMIT, RECIPE_COUNT_PER_PAGE};

pub const DEFAULT_CONFIG_FILE: &str = "foodgram.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://foodgram.sqlite3".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key used to sign auth tokens. Set FOODGRAM__AUTH__SECRET_KEY in production.
    pub secret_key: String,
    pub token_lifetime_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "change-me".to_string(),
            token_lifetime_hours: 24 * 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Default recipe preview length for subscription listings
    pub recipes_limit: i64,
    pub page_size: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            recipes_limit: RECIPES_LIMIT,
            page_size: RECIPE_COUNT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub api: ApiConfig,
}

impl AppConfig {
    /// Layers `path` (optional) and the environment over the defaults
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("FOODGRAM")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        if config.auth.secret_key == AuthConfig::default().secret_key {
            log::warn!("auth.secret_key is unset; tokens are signed with the default key");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_file() {
        let config = AppConfig::load_from("/nonexistent/foodgram").unwrap();
        assert_eq!(config.api.recipes_limit, RECIPES_LIMIT);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nrecipes_limit = 10\n\n[auth]\ntoken_lifetime_hours = 2\n"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api.recipes_limit, 10);
        assert_eq!(config.api.page_size, RECIPE_COUNT_PER_PAGE);
        assert_eq!(config.auth.token_lifetime_hours, 2);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }
}
