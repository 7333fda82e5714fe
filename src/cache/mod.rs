//! Cache module - cache-aside layer in front of the product store.
//!
//! ## Architecture
//!
//! - `CacheBackend` - key-value contract (get/set with TTL/delete, plus hash
//!   fields), implemented by `RedisBackend`, `MemoryBackend` (Moka) and
//!   `NoopBackend`
//! - `CacheCoordinator` - the coherence policy: key naming, TTL, fill on
//!   miss, invalidation after writes
//! - `codec` / `keys` - value encoding and the key scheme
//!
//! ## Usage
//!
//! ```rust
//! let backend = Arc::new(MemoryBackend::new(config.max_capacity));
//! let coordinator = CacheCoordinator::new(backend, config);
//!
//! let products = coordinator.read_collection(&store).await?;
//! coordinator.invalidate_on_write(id).await;
//! ```

mod backend;
mod codec;
mod config;
mod coordinator;
mod keys;
mod memory;
mod noop;
mod redis;

pub use backend::{CacheBackend, CacheError, CacheResult};
pub use config::{CacheConfig, CacheLayout};
pub use coordinator::{CacheCoordinator, CacheStats};
pub use memory::MemoryBackend;
pub use noop::NoopBackend;
pub use self::redis::RedisBackend;
