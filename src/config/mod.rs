//! Configuration layer: typed settings with layered precedence (file → env).
//!
//! Settings come from `config/default.toml`, then a local `foglio.toml`, then
//! `FOGLIO__*` environment variables. Cache stores and repositories are
//! declared as tables:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [[caches]]
//! name = "content"
//! capacity = 512
//! flush_minutes = 30
//!
//! [[repositories]]
//! name = "site"
//! root = "/srv/site/content"
//! cache = "content"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "foglio";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CACHE_BACKEND: &str = "lru";
const DEFAULT_CACHE_CAPACITY: usize = 512;
const DEFAULT_CONFIG_DIR: &str = "config";
const DEFAULT_CONFIG_SUFFIX: &str = "xml";

/// Fully validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub caches: Vec<CacheSettings>,
    pub repositories: Vec<RepositorySettings>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// One declared cache store.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub name: String,
    pub backend: String,
    pub capacity: usize,
    /// Sum of the declared millisecond/second/minute/hour components.
    pub flush_interval: Duration,
}

/// One declared content repository.
#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub name: String,
    pub root: PathBuf,
    /// Name of the cache store to use; `None` disables caching.
    pub cache: Option<String>,
    pub write_allowed: bool,
    pub config_dir: String,
    pub config_suffix: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings from the default file locations and the environment.
pub fn load() -> Result<Settings, LoadError> {
    let raw: RawSettings = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false))
        .add_source(Environment::with_prefix("FOGLIO").separator("__"))
        .build()?
        .try_deserialize()?;
    Settings::from_raw(raw)
}

/// Load settings from an explicit file, still layered under the environment.
pub fn load_from(path: &Path) -> Result<Settings, LoadError> {
    let raw: RawSettings = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(Environment::with_prefix("FOGLIO").separator("__"))
        .build()?
        .try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    caches: Vec<RawCacheSettings>,
    repositories: Vec<RawRepositorySettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    name: Option<String>,
    backend: Option<String>,
    capacity: Option<usize>,
    flush_milliseconds: Option<u64>,
    flush_seconds: Option<u64>,
    flush_minutes: Option<u64>,
    flush_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRepositorySettings {
    name: Option<String>,
    root: Option<PathBuf>,
    cache: Option<String>,
    write_allowed: Option<bool>,
    config_dir: Option<String>,
    config_suffix: Option<String>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            caches,
            repositories,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let caches = caches
            .into_iter()
            .map(build_cache_settings)
            .collect::<Result<Vec<_>, _>>()?;
        let repositories = repositories
            .into_iter()
            .map(build_repository_settings)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            logging,
            caches,
            repositories,
        })
    }
}

fn build_logging_settings(raw: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level_text = raw.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    let level = LevelFilter::from_str(level_text)
        .map_err(|_| LoadError::invalid("logging.level", format!("unknown level `{level_text}`")))?;
    let format = if raw.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(raw: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let name = raw
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| LoadError::invalid("caches.name", "cache definition requires a name"))?;

    let flush_interval = Duration::from_millis(raw.flush_milliseconds.unwrap_or(0))
        + Duration::from_secs(raw.flush_seconds.unwrap_or(0))
        + Duration::from_secs(raw.flush_minutes.unwrap_or(0) * 60)
        + Duration::from_secs(raw.flush_hours.unwrap_or(0) * 3600);

    Ok(CacheSettings {
        name,
        backend: raw.backend.unwrap_or_else(|| DEFAULT_CACHE_BACKEND.to_string()),
        capacity: raw.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        flush_interval,
    })
}

fn build_repository_settings(raw: RawRepositorySettings) -> Result<RepositorySettings, LoadError> {
    let name = raw
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            LoadError::invalid("repositories.name", "repository definition requires a name")
        })?;
    let root = raw
        .root
        .filter(|root| !root.as_os_str().is_empty())
        .ok_or_else(|| {
            LoadError::invalid("repositories.root", "repository definition requires a root")
        })?;

    Ok(RepositorySettings {
        name,
        root,
        cache: raw.cache.filter(|cache| !cache.is_empty()),
        write_allowed: raw.write_allowed.unwrap_or(false),
        config_dir: raw.config_dir.unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string()),
        config_suffix: raw
            .config_suffix
            .unwrap_or_else(|| DEFAULT_CONFIG_SUFFIX.to_string()),
    })
}
