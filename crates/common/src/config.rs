//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Poll behavior configuration.
    #[serde(default)]
    pub poll: PollConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Poll behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// How many times poll creation retries on a short-id collision
    /// before giving up.
    #[serde(default = "default_id_retry_attempts")]
    pub id_retry_attempts: u32,
    /// Maximum number of options a poll may carry.
    #[serde(default = "default_max_options")]
    pub max_options: usize,
    /// Maximum length of a single option text, in characters.
    #[serde(default = "default_max_option_len")]
    pub max_option_len: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            id_retry_attempts: default_id_retry_attempts(),
            max_options: default_max_options(),
            max_option_len: default_max_option_len(),
        }
    }
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_id_retry_attempts() -> u32 {
    5
}

const fn default_max_options() -> usize {
    10
}

const fn default_max_option_len() -> usize {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `POLLBOT_ENV`)
    /// 3. Environment variables with `POLLBOT_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("POLLBOT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLLBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
