//! Runtime configuration
//!
//! Everything is read from the environment (optionally seeded from a `.env`
//! file). Broker credentials are only required when the live Angel One
//! source is selected.

use crate::error::{AppError, Result};
use crate::market::{load_tables, ConstituentTable};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://apiconnect.angelone.in";
pub const MIN_REFRESH_SECS: u64 = 5;

/// Where market data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Live Angel One SmartAPI
    Angel,
    /// Fixed sample data, clearly labelled as such
    Sample,
}

impl FromStr for DataSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angel" | "live" => Ok(DataSource::Angel),
            "sample" | "demo" => Ok(DataSource::Sample),
            other => Err(AppError::Config(format!(
                "Unknown data source '{}', expected 'angel' or 'sample'",
                other
            ))),
        }
    }
}

/// Angel One login material
#[derive(Clone)]
pub struct AngelConfig {
    pub api_key: String,
    pub client_id: String,
    pub password: String,
    pub totp_secret: String,
}

impl std::fmt::Debug for AngelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AngelConfig")
            .field("api_key", &crate::security::mask_secret(&self.api_key, 4))
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_source: DataSource,
    pub angel: Option<AngelConfig>,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub refresh_interval_secs: u64,
    pub http_timeout_secs: u64,
    pub constituents_file: Option<PathBuf>,
    pub max_price_lookups: usize,
    pub api_rate_limit: u32,
    pub refresh_rate_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::Sample,
            angel: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            refresh_interval_secs: 30,
            http_timeout_secs: 10,
            constituents_file: None,
            max_price_lookups: 20,
            api_rate_limit: 50,
            refresh_rate_limit: 1,
        }
    }
}

impl AppConfig {
    /// Load from process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::info!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let data_source = match get(&["SENTIMENT_DATA_SOURCE"]) {
            Some(value) => value.parse()?,
            None => DataSource::Angel,
        };

        let angel = match data_source {
            DataSource::Angel => {
                let require = |keys: &[&str]| {
                    get(keys).ok_or_else(|| {
                        AppError::Config(format!("Missing required setting {}", keys[0]))
                    })
                };
                Some(AngelConfig {
                    api_key: require(&["ANGEL_API_KEY"])?,
                    client_id: require(&["ANGEL_CLIENT_ID", "ANGEL_USERNAME"])?,
                    password: require(&["ANGEL_PASSWORD"])?,
                    totp_secret: require(&["ANGEL_TOTP_SECRET", "ANGEL_TOTP_TOKEN"])?,
                })
            }
            DataSource::Sample => None,
        };

        let base_url = get(&["ANGEL_BASE_URL"]).unwrap_or(defaults.base_url);
        let parsed = url::Url::parse(&base_url).map_err(|e| {
            AppError::Config(format!("Invalid ANGEL_BASE_URL '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "ANGEL_BASE_URL must be http(s), got '{}'",
                base_url
            )));
        }

        let refresh_interval_secs = parse_or(
            get(&["SENTIMENT_REFRESH_SECS"]),
            "SENTIMENT_REFRESH_SECS",
            defaults.refresh_interval_secs,
        )?;
        if refresh_interval_secs < MIN_REFRESH_SECS {
            return Err(AppError::Config(format!(
                "SENTIMENT_REFRESH_SECS must be at least {}",
                MIN_REFRESH_SECS
            )));
        }

        Ok(Self {
            data_source,
            angel,
            base_url: base_url.trim_end_matches('/').to_string(),
            host: get(&["SENTIMENT_HOST"]).unwrap_or(defaults.host),
            port: parse_or(get(&["SENTIMENT_PORT", "PORT"]), "SENTIMENT_PORT", defaults.port)?,
            refresh_interval_secs,
            http_timeout_secs: parse_or(
                get(&["SENTIMENT_HTTP_TIMEOUT_SECS"]),
                "SENTIMENT_HTTP_TIMEOUT_SECS",
                defaults.http_timeout_secs,
            )?,
            constituents_file: get(&["SENTIMENT_CONSTITUENTS_FILE"]).map(PathBuf::from),
            max_price_lookups: parse_or(
                get(&["SENTIMENT_MAX_PRICE_LOOKUPS"]),
                "SENTIMENT_MAX_PRICE_LOOKUPS",
                defaults.max_price_lookups,
            )?,
            api_rate_limit: parse_or(
                get(&["SENTIMENT_API_RATE"]),
                "SENTIMENT_API_RATE",
                defaults.api_rate_limit,
            )?,
            refresh_rate_limit: parse_or(
                get(&["SENTIMENT_REFRESH_RATE"]),
                "SENTIMENT_REFRESH_RATE",
                defaults.refresh_rate_limit,
            )?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                AppError::Config(format!("Invalid address {}:{}: {}", self.host, self.port, e))
            })
    }

    /// Constituent tables from the configured file, or the built-in ones
    pub fn load_tables(&self) -> Result<Vec<ConstituentTable>> {
        match &self.constituents_file {
            Some(path) => load_tables(path),
            None => Ok(ConstituentTable::defaults()),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", key, v, e))),
        None => Ok(default),
    }
}
