//! Service configuration, read from the environment (and `.env` when present).

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

use crate::error::ConfigError;
use crate::store::PostgresConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the product catalog (`PRODUCT_SERVICE_URL`)
    pub product_service_url: String,
    /// Postgres connection; `None` runs with the in-process order store
    pub database: Option<PgConnectOptions>,
    pub postgres: PostgresConfig,
    pub catalog_timeout: Duration,
    pub product_cache_ttl: Duration,
    pub order_list_cache_ttl: Duration,
    /// Bound on each detached post-commit or cache-population task
    pub background_timeout: Duration,
    /// Default deadline applied to inbound requests
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let product_service_url = get("PRODUCT_SERVICE_URL").ok_or(ConfigError::Missing("PRODUCT_SERVICE_URL"))?;

        let database = match (get("DATABASE_URL"), get("DB_HOST")) {
            (Some(url), _) => Some(url.parse::<PgConnectOptions>().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_URL",
                value: "<redacted>".into(),
            })?),
            (None, Some(host)) => {
                let mut options = PgConnectOptions::new()
                    .host(&host)
                    .port(parse_or(&get, "DB_PORT", 5432u16)?)
                    .username(&get("DB_USER").unwrap_or_else(|| "postgres".into()))
                    .database(&get("DB_NAME").unwrap_or_else(|| "orders".into()));
                if let Some(pass) = get("DB_PASS") {
                    options = options.password(&pass);
                }
                Some(options)
            }
            (None, None) => None,
        };

        let defaults = PostgresConfig::default();
        let postgres = PostgresConfig {
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
            acquire_timeout: secs_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout)?,
            ..defaults
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            product_service_url,
            database,
            postgres,
            catalog_timeout: secs_or(&get, "CATALOG_TIMEOUT_SECS", Duration::from_secs(5))?,
            product_cache_ttl: secs_or(&get, "PRODUCT_CACHE_TTL_SECS", Duration::from_secs(5 * 60))?,
            order_list_cache_ttl: secs_or(&get, "ORDER_LIST_CACHE_TTL_SECS", Duration::from_secs(10 * 60))?,
            background_timeout: secs_or(&get, "BACKGROUND_TIMEOUT_SECS", Duration::from_secs(5))?,
            request_timeout: secs_or(&get, "REQUEST_TIMEOUT_SECS", Duration::from_secs(10))?,
            log_format,
        })
    }
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match get(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn secs_or(get: &impl Fn(&str) -> Option<String>, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_or(get, name, default.as_secs()).map(Duration::from_secs)
}
