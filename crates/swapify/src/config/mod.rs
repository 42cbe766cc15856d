use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

use crate::marketplace::CreditPolicy;

const DEFAULT_POST_TTL_DAYS: i64 = 30;
const MAX_POST_TTL_DAYS: i64 = 3650;
const DEFAULT_CURRENCY: &str = "INR";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let marketplace = MarketplaceConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            marketplace,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Policy dials for the exchange marketplace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    pub post_ttl_days: i64,
    pub default_currency: String,
    pub exchange_credit: CreditPolicy,
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let post_ttl_days = match env::var("APP_POST_TTL_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (1..=MAX_POST_TTL_DAYS).contains(days))
                .ok_or(ConfigError::InvalidPostTtl { value: raw })?,
            Err(_) => DEFAULT_POST_TTL_DAYS,
        };

        let default_currency = match env::var("APP_DEFAULT_CURRENCY") {
            Ok(raw) => {
                let code = raw.trim().to_ascii_uppercase();
                if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(ConfigError::InvalidCurrency { value: raw });
                }
                code
            }
            Err(_) => DEFAULT_CURRENCY.to_string(),
        };

        let exchange_credit = match env::var("APP_EXCHANGE_CREDIT") {
            Ok(raw) => CreditPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidCreditPolicy { value: raw })?,
            Err(_) => CreditPolicy::default(),
        };

        Ok(Self {
            post_ttl_days,
            default_currency,
            exchange_credit,
        })
    }

    /// `None` when the configured day count does not fit a `Duration`.
    pub fn post_ttl(&self) -> Option<Duration> {
        Duration::try_days(self.post_ttl_days)
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            post_ttl_days: DEFAULT_POST_TTL_DAYS,
            default_currency: DEFAULT_CURRENCY.to_string(),
            exchange_credit: CreditPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPostTtl { value: String },
    InvalidCurrency { value: String },
    InvalidCreditPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPostTtl { value } => {
                write!(
                    f,
                    "APP_POST_TTL_DAYS must be between 1 and {MAX_POST_TTL_DAYS}, got '{value}'"
                )
            }
            ConfigError::InvalidCurrency { value } => {
                write!(f, "APP_DEFAULT_CURRENCY must be a 3-letter code, got '{value}'")
            }
            ConfigError::InvalidCreditPolicy { value } => write!(
                f,
                "APP_EXCHANGE_CREDIT must be 'counterpart' or 'both', got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPostTtl { .. }
            | ConfigError::InvalidCurrency { .. }
            | ConfigError::InvalidCreditPolicy { .. } => None,
        }
    }
}
