//! Stockpile - cache-aside product service.
//!
//! Serves product CRUD over HTTP with reads absorbed by a cache in front of
//! the system of record.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - Product store trait, MongoDB and in-memory stores
//! - `cache` - Cache backends (Redis, Moka) and the coherence coordinator
//! - `service` - Product operations routed through the coordinator
//! - `http` - axum routes over the service

mod cache;
mod config;
mod database;
mod http;
mod service;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::{CacheBackend, CacheCoordinator, MemoryBackend, NoopBackend, RedisBackend};
use config::{CacheKind, Config, StoreKind};
use database::{Database, InMemoryProductRepo, MongoProductRepo, ProductStore};
use service::ProductService;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stockpile=info,mongodb=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Stockpile...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!(
        "Store: {:?}, cache: {:?} ({:?} layout, ttl {}s, namespace '{}')",
        config.store,
        config.cache_kind,
        config.cache.layout,
        config.cache.ttl.as_secs(),
        config.cache.namespace
    );

    let store = connect_store(&config).await?;
    let backend = connect_cache(&config).await?;

    let coordinator = Arc::new(CacheCoordinator::new(backend, config.cache.clone()));
    let service = ProductService::new(store, coordinator);

    http::serve(config.http_addr, service).await
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn ProductStore>> {
    match config.store {
        StoreKind::MongoDb => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI must be set"))?;

            info!("Connecting to MongoDB...");
            let db = Database::connect(uri, &config.mongodb_database).await?;
            let repo = MongoProductRepo::new(&db);
            repo.ensure_indexes().await?;
            info!("Database connected");
            Ok(Arc::new(repo))
        }
        StoreKind::Memory => {
            info!("Using in-memory product store (data is not persisted)");
            Ok(Arc::new(InMemoryProductRepo::new()))
        }
    }
}

async fn connect_cache(config: &Config) -> anyhow::Result<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match config.cache_kind {
        CacheKind::Redis => {
            info!("Connecting to Redis...");
            Arc::new(RedisBackend::connect(&config.redis_url).await?)
        }
        CacheKind::Memory => Arc::new(MemoryBackend::new(config.cache.max_capacity)),
        CacheKind::None => Arc::new(NoopBackend),
    };

    info!("Cache backend initialized: {}", backend.name());
    Ok(backend)
}
