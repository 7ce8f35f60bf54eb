//! Configuration module
//!
//! Env-driven configuration with defaults for every tunable. Binaries load
//! `.env` via `dotenvy` before calling [`Config::from_env`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::report::Coordinates;

const DEFAULT_STORAGE_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 512 * 1024;
const DEFAULT_PROGRESS_POLL_MS: u64 = 150;
const DEFAULT_DEBOUNCE_MS: u64 = 1000;
const DEFAULT_GEOCODE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POSITION_TIMEOUT_SECS: u64 = 15;
const DEFAULT_POSITION_CACHE_SECS: u64 = 300;
const DEFAULT_HISTORY_CAP: usize = 10;
const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP transport settings for the outgoing report mail.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub starttls: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the drive storage API.
    pub storage_api_base: String,
    /// Chunk size for resumable uploads, in bytes.
    pub upload_chunk_bytes: usize,
    /// Interval of the aggregate-progress polling loop.
    pub progress_poll_interval: Duration,
    /// Settle delay before a map movement triggers a reverse lookup.
    pub geocode_debounce: Duration,
    /// Per-request timeout for geocoding providers.
    pub geocode_timeout: Duration,
    /// Bounded wait for position acquisition.
    pub position_timeout: Duration,
    /// Accepted age of a cached position.
    pub position_cache_tolerance: Duration,
    /// Maximum number of remembered recipient entries.
    pub recipient_history_cap: usize,
    /// Fallback position when the host supplies none.
    pub default_position: Option<Coordinates>,
    /// Override for the local data directory.
    pub data_dir: Option<PathBuf>,
    /// Access credential for the storage provider, if configured.
    pub access_token: Option<String>,
    /// SMTP settings; `None` disables mail transport.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

fn env_parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let smtp = match (env_opt("SMTP_HOST"), env_opt("SMTP_FROM")) {
            (Some(host), Some(from)) => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username: env_opt("SMTP_USER"),
                password: env_opt("SMTP_PASSWORD"),
                from,
                starttls: env_parse("SMTP_STARTTLS", true)?,
            }),
            _ => None,
        };

        Ok(Config {
            storage_api_base: env_opt("INCYDENT_STORAGE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STORAGE_API_BASE.to_string()),
            upload_chunk_bytes: env_parse("INCYDENT_UPLOAD_CHUNK_BYTES", DEFAULT_UPLOAD_CHUNK_BYTES)?,
            progress_poll_interval: Duration::from_millis(env_parse(
                "INCYDENT_PROGRESS_POLL_MS",
                DEFAULT_PROGRESS_POLL_MS,
            )?),
            geocode_debounce: Duration::from_millis(env_parse(
                "INCYDENT_DEBOUNCE_MS",
                DEFAULT_DEBOUNCE_MS,
            )?),
            geocode_timeout: Duration::from_secs(env_parse(
                "INCYDENT_GEOCODE_TIMEOUT_SECS",
                DEFAULT_GEOCODE_TIMEOUT_SECS,
            )?),
            position_timeout: Duration::from_secs(env_parse(
                "INCYDENT_POSITION_TIMEOUT_SECS",
                DEFAULT_POSITION_TIMEOUT_SECS,
            )?),
            position_cache_tolerance: Duration::from_secs(env_parse(
                "INCYDENT_POSITION_CACHE_SECS",
                DEFAULT_POSITION_CACHE_SECS,
            )?),
            recipient_history_cap: env_parse("INCYDENT_HISTORY_CAP", DEFAULT_HISTORY_CAP)?,
            default_position: match (env_opt("INCYDENT_DEFAULT_LAT"), env_opt("INCYDENT_DEFAULT_LNG")) {
                (Some(lat), Some(lng)) => Some(Coordinates {
                    lat: lat.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "INCYDENT_DEFAULT_LAT",
                        value: lat,
                    })?,
                    lng: lng.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "INCYDENT_DEFAULT_LNG",
                        value: lng,
                    })?,
                }),
                _ => None,
            },
            data_dir: env_opt("INCYDENT_DATA_DIR").map(PathBuf::from),
            access_token: env_opt("INCYDENT_ACCESS_TOKEN"),
            smtp,
        })
    }
}
