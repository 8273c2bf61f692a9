use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{TimeDelta, Utc};
use tracing::warn;

use crate::error::ConfigError;

const DEV_JWT_SECRET: &str = "change-me-in-production-use-a-strong-random-secret";
const DEFAULT_SOURCE_URL: &str = "https://www.wgospel.com/tempoderefletir/";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // App
    pub app_name: String,
    pub app_version: String,
    pub environment: String,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub cors_origins: Vec<String>,

    // JWT
    pub jwt_secret_key: String,
    pub jwt_access_token_expire_minutes: i64,
    pub jwt_refresh_token_expire_days: i64,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    /// Size of the contracted database plan, in bytes.
    pub render_db_size_bytes: i64,
    pub storage_snapshot_interval_secs: u64,

    // JSON-file store
    pub data_dir: PathBuf,
    pub seed_demo_data: bool,

    // AI provider
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    // Scraping
    pub scraper_source_url: String,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let is_production = environment.eq_ignore_ascii_case("production");

        let jwt_secret_key = match get("JWT_SECRET_KEY") {
            Some(secret) => secret,
            None if is_production => return Err(ConfigError::Missing("JWT_SECRET_KEY")),
            None => {
                warn!("JWT_SECRET_KEY not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let seed_demo_data = match get("SEED_DEMO_DATA") {
            Some(v) => parse_bool("SEED_DEMO_DATA", &v)?,
            None => environment == "development",
        };

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or_else(|| "Vida com Deus API".to_string()),
            app_version: get("APP_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            environment,
            api_host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: parse_or("API_PORT", get("API_PORT"), 8000)?,
            cors_origins,
            jwt_secret_key,
            jwt_access_token_expire_minutes: parse_ttl(
                TimeDelta::try_minutes,
                "JWT_ACCESS_TOKEN_EXPIRE_MINUTES",
                get("JWT_ACCESS_TOKEN_EXPIRE_MINUTES"),
                15,
            )?,
            jwt_refresh_token_expire_days: parse_ttl(
                TimeDelta::try_days,
                "JWT_REFRESH_TOKEN_EXPIRE_DAYS",
                get("JWT_REFRESH_TOKEN_EXPIRE_DAYS"),
                7,
            )?,
            database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                10,
            )?,
            render_db_size_bytes: parse_positive(
                "RENDER_DB_SIZE_BYTES",
                get("RENDER_DB_SIZE_BYTES"),
                1_073_741_824,
            )?,
            storage_snapshot_interval_secs: parse_or(
                "STORAGE_SNAPSHOT_INTERVAL_SECS",
                get("STORAGE_SNAPSHOT_INTERVAL_SECS"),
                6 * 3600,
            )?,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            seed_demo_data,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            scraper_source_url: get("SCRAPER_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

fn parse_positive(key: &'static str, value: Option<String>, default: i64) -> Result<i64, ConfigError> {
    let parsed = parse_or(key, value, default)?;
    if parsed <= 0 {
        return Err(ConfigError::Invalid {
            key,
            value: parsed.to_string(),
        });
    }
    Ok(parsed)
}

/// A positive token lifetime whose expiry, counted from now, is still a valid timestamp.
fn parse_ttl(
    unit: fn(i64) -> Option<TimeDelta>,
    key: &'static str,
    value: Option<String>,
    default: i64,
) -> Result<i64, ConfigError> {
    let parsed = parse_positive(key, value, default)?;
    match unit(parsed).and_then(|ttl| Utc::now().checked_add_signed(ttl)) {
        Some(_) => Ok(parsed),
        None => Err(ConfigError::Invalid {
            key,
            value: parsed.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
