//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, GlobalOverrides, ListArgs};

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::listing::ListingLimits;
use crate::cache::{CacheBackend, CacheConfig, LISTING_NAMESPACE, RedisCacheConfig};
use crate::infra::storage::StorageLayout;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "newsdesk";
const ENV_PREFIX: &str = "NEWSDESK";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_MEMORY_CAPACITY: usize = 256;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_REDIS_POOL_SIZE: usize = 8;
const DEFAULT_REDIS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STORAGE_DIR: &str = "uploads";
const DEFAULT_STORAGE_KEY_PREFIX: &str = "images/filemanager";
const DEFAULT_LISTING_LIMIT: u32 = 10;
const DEFAULT_LISTING_MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheConfig,
    pub storage: StorageSettings,
    pub listing: ListingLimits,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Filesystem {
        directory: PathBuf,
    },
    S3 {
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub public_base_url: Option<Url>,
    pub key_prefix: String,
}

impl StorageSettings {
    /// Object layout for publishers; ingestion needs a public base URL.
    pub fn layout(&self) -> Result<StorageLayout, LoadError> {
        let base = self.public_base_url.as_ref().ok_or_else(|| {
            LoadError::invalid("storage.public_base_url", "required for image ingestion")
        })?;
        Ok(StorageLayout::new(base.as_str(), self.key_prefix.as_str()))
    }
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

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    storage: RawStorageSettings,
    listing: RawListingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(directory) = overrides.storage_directory.as_ref() {
            self.storage.directory = Some(directory.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            storage,
            listing,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            storage: build_storage_settings(storage)?,
            listing: build_listing_settings(listing)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheConfig, LoadError> {
    let backend = match non_blank(cache.backend).as_deref() {
        None => CacheBackend::default(),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "memory" => CacheBackend::Memory,
            "redis" => CacheBackend::Redis,
            "disabled" | "none" | "off" => CacheBackend::Disabled,
            other => {
                return Err(LoadError::invalid(
                    "cache.backend",
                    format!("unknown backend `{other}` (expected memory, redis or disabled)"),
                ));
            }
        },
    };

    let namespace = non_blank(cache.namespace).unwrap_or_else(|| LISTING_NAMESPACE.to_string());

    let memory_capacity = cache
        .memory_capacity
        .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY);
    let memory_capacity = NonZeroUsize::new(memory_capacity)
        .ok_or_else(|| LoadError::invalid("cache.memory_capacity", "must be greater than zero"))?;

    let redis_url = non_blank(cache.redis_url).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
    if backend == CacheBackend::Redis {
        Url::parse(&redis_url)
            .map_err(|err| LoadError::invalid("cache.redis_url", format!("invalid URL: {err}")))?;
    }

    let pool_size = cache.redis_pool_size.unwrap_or(DEFAULT_REDIS_POOL_SIZE);
    if pool_size == 0 {
        return Err(LoadError::invalid(
            "cache.redis_pool_size",
            "must be greater than zero",
        ));
    }

    let timeout = cache
        .redis_timeout_seconds
        .unwrap_or(DEFAULT_REDIS_TIMEOUT_SECS);
    if timeout == 0 {
        return Err(LoadError::invalid(
            "cache.redis_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheConfig {
        backend,
        namespace,
        memory_capacity: memory_capacity.get(),
        redis: RedisCacheConfig {
            url: redis_url,
            pool_size,
            connection_timeout: Duration::from_secs(timeout),
        },
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let backend = match non_blank(storage.backend)
        .map(|value| value.to_ascii_lowercase())
        .as_deref()
    {
        None | Some("filesystem") | Some("fs") => StorageBackend::Filesystem {
            directory: storage
                .directory
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
        },
        Some("s3") => {
            let bucket = non_blank(storage.bucket).ok_or_else(|| {
                LoadError::invalid("storage.bucket", "required for the s3 backend")
            })?;
            let region = non_blank(storage.region).ok_or_else(|| {
                LoadError::invalid("storage.region", "required for the s3 backend")
            })?;
            let endpoint_url = non_blank(storage.endpoint_url);
            if let Some(endpoint) = endpoint_url.as_deref() {
                Url::parse(endpoint).map_err(|err| {
                    LoadError::invalid("storage.endpoint_url", format!("invalid URL: {err}"))
                })?;
            }
            StorageBackend::S3 {
                bucket,
                region,
                endpoint_url,
            }
        }
        Some(other) => {
            return Err(LoadError::invalid(
                "storage.backend",
                format!("unknown backend `{other}` (expected filesystem or s3)"),
            ));
        }
    };

    let public_base_url = non_blank(storage.public_base_url)
        .map(|value| {
            Url::parse(&value).map_err(|err| {
                LoadError::invalid("storage.public_base_url", format!("invalid URL: {err}"))
            })
        })
        .transpose()?;

    let key_prefix = storage
        .key_prefix
        .map(|value| value.trim().trim_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_STORAGE_KEY_PREFIX.to_string());

    Ok(StorageSettings {
        backend,
        public_base_url,
        key_prefix,
    })
}

fn build_listing_settings(listing: RawListingSettings) -> Result<ListingLimits, LoadError> {
    let default_limit = non_zero_u32(
        listing.default_limit.unwrap_or(DEFAULT_LISTING_LIMIT).into(),
        "listing.default_limit",
    )?;
    let max_limit = non_zero_u32(
        listing.max_limit.unwrap_or(DEFAULT_LISTING_MAX_LIMIT).into(),
        "listing.max_limit",
    )?;
    if default_limit > max_limit {
        return Err(LoadError::invalid(
            "listing.default_limit",
            format!("must not exceed listing.max_limit ({max_limit})"),
        ));
    }

    Ok(ListingLimits {
        default_limit,
        max_limit,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    namespace: Option<String>,
    memory_capacity: Option<usize>,
    redis_url: Option<String>,
    redis_pool_size: Option<usize>,
    redis_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    backend: Option<String>,
    public_base_url: Option<String>,
    key_prefix: Option<String>,
    directory: Option<PathBuf>,
    bucket: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListingSettings {
    default_limit: Option<u32>,
    max_limit: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
