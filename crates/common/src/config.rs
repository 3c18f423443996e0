use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Database configuration.
#[derive(Deserialize)]
pub struct Database {
    /// Database URL string.
    pub url: String,
}

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

/// Vanity address pool configuration.
#[derive(Clone, Deserialize)]
pub struct Pool {
    /// Suffix that generated public keys must end with.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Accept any ASCII case permutation of the suffix.
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,

    /// Minimum count of available addresses the scheduler maintains.
    #[serde(default = "default_target_size")]
    pub target_size: u64,

    /// Max addresses generated in one scheduler iteration before the
    /// available count and stop signal are re-checked.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Pause between watermark checks when the pool is full, in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Pause after a failed generation round, in seconds.
    #[serde(default = "default_error_backoff")]
    pub error_backoff: u64,

    /// Wall-clock budget for a single address search, in seconds.
    #[serde(default = "default_search_deadline")]
    pub search_deadline: u64,

    /// Attempt ceiling for a single address search.
    #[serde(default = "default_search_attempt_limit")]
    pub search_attempt_limit: u64,
}

impl Default for Pool {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            case_insensitive: default_case_insensitive(),
            target_size: default_target_size(),
            batch_size: default_batch_size(),
            check_interval: default_check_interval(),
            error_backoff: default_error_backoff(),
            search_deadline: default_search_deadline(),
            search_attempt_limit: default_search_attempt_limit(),
        }
    }
}

// Default values used for pool configuration.
// These are picked to match the operator tooling this crate replaced,
// but it's nonetheless recommended to adjust values as needed.
fn default_suffix() -> String {
    String::from("LOCK")
}

fn default_case_insensitive() -> bool {
    true
}

fn default_target_size() -> u64 {
    100
}

fn default_batch_size() -> u64 {
    10
}

fn default_check_interval() -> u64 {
    30
}

fn default_error_backoff() -> u64 {
    10
}

fn default_search_deadline() -> u64 {
    2400
}

fn default_search_attempt_limit() -> u64 {
    10_000_000
}

/// General configuration.
#[derive(Deserialize)]
pub struct Config {
    /// General database configuration.
    pub database: Database,

    /// Vanity address pool configuration.
    #[serde(default)]
    pub pool: Pool,

    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    /// Create new config using default configuration file or environment variables.
    ///
    /// See [`Env`] for more details on how to use environment variables configuration.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.unwrap_or(PathBuf::from("Config.toml"))))
            .merge(Env::prefixed("CONFIG_").split("_"))
            .extract()
    }

    /// Create new config suitable for running unit tests.
    #[cfg(feature = "test-utils")]
    pub fn for_tests() -> Self {
        Self {
            database: Database {
                url: String::from("sqlite::memory:"),
            },
            pool: Pool::default(),
            #[cfg(feature = "logging")]
            logging: Logging::default(),
        }
    }
}
