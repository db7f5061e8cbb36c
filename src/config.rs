use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    /// Used to build password reset links.
    pub app_base_url: String,
    pub catalog_cache_ttl_secs: u64,

    /// `None` disables email delivery.
    pub smtp: Option<SmtpConfig>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
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

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: parsed("SMTP_PORT", 587)?,
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: required("MAIL_FROM")?,
            }),
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parsed("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            catalog_cache_ttl_secs: parsed("CATALOG_CACHE_TTL_SECS", 300)?,
            smtp,
        })
    }

    /// Settings for tests and local tooling; no environment lookups.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 604_800,
            rate_login_per_min: 1000,
            rate_register_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 10_000,
            api_prefix: "/api".to_string(),
            app_base_url: "http://localhost:8080".to_string(),
            catalog_cache_ttl_secs: 300,
            smtp: None,
        }
    }
}
