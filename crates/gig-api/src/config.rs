//! API configuration.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Signing secret used outside production when `JWT_SECRET` is unset.
const DEV_JWT_SECRET: &str = "gigboard-development-secret-change-me";

/// Minimum signing secret length accepted in production.
const MIN_JWT_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingJwtSecret,

    #[error("JWT_SECRET must be at least 16 bytes")]
    WeakJwtSecret,

    #[error("Unknown STORE_BACKEND '{0}' (expected 'firestore' or 'memory')")]
    UnknownStoreBackend(String),

    #[error("TOKEN_TTL_HOURS must be a positive number of hours, got '{0}'")]
    InvalidTokenTtl(String),
}

/// Whether an `ENVIRONMENT` value names production (any case).
pub fn is_production_environment(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("production")
}

/// Whether the process environment is production.
pub fn running_in_production() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|v| is_production_environment(&v))
        .unwrap_or(false)
}

fn parse_token_ttl(value: Option<String>) -> Result<Duration, ConfigError> {
    let Some(raw) = value.filter(|s| !s.trim().is_empty()) else {
        return Ok(Duration::from_secs(24 * 3600));
    };
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|hours| *hours > 0)
        .and_then(|hours| hours.checked_mul(3600))
        .filter(|secs| i64::try_from(*secs).is_ok())
        .map(Duration::from_secs)
        .ok_or(ConfigError::InvalidTokenTtl(raw))
}

/// Where documents are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownStoreBackend(other.to_string())),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    /// Session token lifetime
    pub token_ttl: Duration,
    pub store_backend: StoreBackend,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: Duration::from_secs(24 * 3600),
            store_backend: StoreBackend::Memory,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = is_production_environment(&environment);

        let jwt_secret = match std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()) {
            Some(secret) if is_production && secret.len() < MIN_JWT_SECRET_LEN => {
                return Err(ConfigError::WeakJwtSecret);
            }
            Some(secret) => secret,
            None if is_production => return Err(ConfigError::MissingJwtSecret),
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let store_backend = match std::env::var("STORE_BACKEND").ok().filter(|s| !s.is_empty()) {
            Some(value) => value.parse()?,
            None if is_production => StoreBackend::Firestore,
            None => StoreBackend::Memory,
        };

        let token_ttl = parse_token_ttl(std::env::var("TOKEN_TTL_HOURS").ok())?;

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            environment,
            jwt_secret,
            token_ttl,
            store_backend,
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.environment)
    }
}
