use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";
const DEV_REFRESH_SECRET: &str = "dev-only-refresh-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub cors_allowed_origins: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry: Duration,
    pub refresh_secret: String,
    pub refresh_expiry: Duration,
    pub reset_token_ttl: Duration,
    pub app_url: String,
    pub max_tickets_per_user: i64,
    pub card_success_rate: f64,
    pub mobile_money_success_rate: f64,
    pub mobile_money_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/campus_events".to_string(),
            database_max_connections: 5,
            host: "0.0.0.0".to_string(),
            port: 3001,
            production: false,
            cors_allowed_origins: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiry: Duration::from_secs(24 * 60 * 60),
            refresh_secret: DEV_REFRESH_SECRET.to_string(),
            refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            reset_token_ttl: Duration::from_secs(60 * 60),
            app_url: "http://localhost:3000".to_string(),
            max_tickets_per_user: 10,
            card_success_rate: 0.95,
            mobile_money_success_rate: 0.9,
            mobile_money_delay: Duration::from_secs(5),
        }
    }
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn seconds(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parsed(name, default.as_secs()).map(Duration::from_secs)
}

fn rate(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = parsed(name, default)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}

fn secret(name: &'static str, production: bool, dev_default: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ if production => Err(ConfigError::Missing(name)),
        _ => {
            tracing::warn!("{name} not set, using development secret");
            Ok(dev_default.to_string())
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parsed(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port)?,
            production,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            jwt_secret: secret("JWT_SECRET", production, DEV_JWT_SECRET)?,
            jwt_expiry: seconds("JWT_EXPIRE_SECS", defaults.jwt_expiry)?,
            refresh_secret: secret("REFRESH_TOKEN_SECRET", production, DEV_REFRESH_SECRET)?,
            refresh_expiry: seconds("REFRESH_TOKEN_EXPIRE_SECS", defaults.refresh_expiry)?,
            reset_token_ttl: seconds("RESET_TOKEN_TTL_SECS", defaults.reset_token_ttl)?,
            app_url: env::var("APP_URL").unwrap_or(defaults.app_url),
            max_tickets_per_user: parsed("MAX_TICKETS_PER_USER", defaults.max_tickets_per_user)?,
            card_success_rate: rate("CARD_SUCCESS_RATE", defaults.card_success_rate)?,
            mobile_money_success_rate: rate(
                "MOBILE_MONEY_SUCCESS_RATE",
                defaults.mobile_money_success_rate,
            )?,
            mobile_money_delay: seconds("MOBILE_MONEY_DELAY_SECS", defaults.mobile_money_delay)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: raw,
        })
    }
}
