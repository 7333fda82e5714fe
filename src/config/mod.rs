//! Configuration module for Stockpile.
//!
//! Loads configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::cache::{CacheConfig, CacheLayout};

/// Where products are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    MongoDb,
    Memory,
}

/// Which cache backend fronts the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheKind {
    #[default]
    Redis,
    Memory,
    /// Caching disabled.
    None,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Store
    pub store: StoreKind,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,

    // Cache
    pub cache_kind: CacheKind,
    pub redis_url: String,
    pub cache: CacheConfig,

    // HTTP
    pub http_addr: SocketAddr,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match var("STORE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("mongodb") | Some("mongo") => StoreKind::MongoDb,
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("unknown STORE_BACKEND '{other}' (expected mongodb or memory)"),
        };

        let mongodb_uri = var("MONGODB_URI");
        if store == StoreKind::MongoDb && mongodb_uri.is_none() {
            bail!("MONGODB_URI must be set when STORE_BACKEND is mongodb");
        }

        let cache_kind = match var("CACHE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("redis") => CacheKind::Redis,
            Some("memory") | Some("moka") => CacheKind::Memory,
            Some("none") | Some("off") => CacheKind::None,
            Some(other) => bail!("unknown CACHE_BACKEND '{other}' (expected redis, memory or none)"),
        };

        let layout = match var("CACHE_LAYOUT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("value") => CacheLayout::Value,
            Some("hash") => CacheLayout::Hash,
            Some(other) => bail!("unknown CACHE_LAYOUT '{other}' (expected value or hash)"),
        };

        let ttl_secs: u64 = parse_or(&var, "CACHE_TTL_SECS", 600)?;
        let max_capacity: u64 = parse_or(&var, "CACHE_MAX_CAPACITY", 10_000)?;

        let cache = CacheConfig::default()
            .namespace(var("CACHE_NAMESPACE").unwrap_or_else(|| "product".to_string()))
            .ttl(Duration::from_secs(ttl_secs))
            .max_capacity(max_capacity)
            .layout(layout)
            .eager_id_fill(flag(&var, "CACHE_EAGER_ID_FILL")?)
            .write_through_updates(flag(&var, "CACHE_WRITE_THROUGH")?);

        let http_addr = var("HTTP_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("HTTP_ADDR must be a socket address like 0.0.0.0:8080")?;

        Ok(Self {
            store,
            mongodb_uri,
            mongodb_database: var("MONGODB_DATABASE").unwrap_or_else(|| "stockpile".to_string()),
            cache_kind,
            redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            cache,
            http_addr,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn flag(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match var(key).as_deref().map(str::to_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => bail!("{key} must be true or false, got '{other}'"),
    }
}
