use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 720;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OWNER: &str = "the site owner";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// Postgres connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub operator_email: String,
    pub operator_password_hash: String,
    pub session_ttl_minutes: i64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub portfolio_owner: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            operator_email: get_env("OPERATOR_EMAIL")?,
            operator_password_hash: get_env("OPERATOR_PASSWORD_HASH")?,
            session_ttl_minutes: get_env_parse_or("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES)?,
            gemini_api_key: get_env_opt("GEMINI_API_KEY"),
            gemini_model: get_env_opt("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            portfolio_owner: get_env_opt("PORTFOLIO_OWNER")
                .unwrap_or_else(|| DEFAULT_OWNER.to_string()),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

/// Unset and blank variables are both treated as absent.
fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
