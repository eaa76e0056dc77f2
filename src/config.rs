//! Runtime configuration read from the environment (and `.env` if present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{CachePolicy, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::models::Period;
use crate::services::yahoo::DEFAULT_BASE_URL;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Sample,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "sample" => Ok(ProviderKind::Sample),
            other => Err(format!("unknown market data provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub provider: ProviderKind,
    pub market_data_base_url: String,
    pub provider_timeout: Duration,
    pub cache: CachePolicy,
    pub default_period: Period,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            port: DEFAULT_PORT,
            provider: ProviderKind::Yahoo,
            market_data_base_url: DEFAULT_BASE_URL.to_string(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache: CachePolicy::default(),
            default_period: Period::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unparseable values
    /// fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let ttl = match parse_or(&lookup, "PRICE_CACHE_TTL_SECONDS", DEFAULT_TTL.as_secs()) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_or(&lookup, "PORT", defaults.port),
            provider: parse_or(&lookup, "MARKET_DATA_PROVIDER", defaults.provider),
            market_data_base_url: lookup("MARKET_DATA_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.market_data_base_url),
            provider_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROVIDER_TIMEOUT_SECONDS",
                defaults.provider_timeout.as_secs(),
            )),
            cache: CachePolicy {
                ttl,
                capacity: parse_or(&lookup, "PRICE_CACHE_CAPACITY", DEFAULT_CAPACITY),
            },
            default_period: parse_or(&lookup, "DEFAULT_PERIOD", defaults.default_period),
        }
    }

    /// Anything other than `production`/`prod` is treated as a sandbox.
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, value = %raw, error = %e, "Ignoring invalid config value");
                default
            }
        },
        None => default,
    }
}
