//! Cache configuration.

use std::time::Duration;

/// Shortest TTL a backend accepts (Redis `SET EX` rejects 0).
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// How per-identity entries are laid out in the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheLayout {
    /// One key per product: `<ns>:<id>`.
    #[default]
    Value,
    /// One hash `<ns>:ids` with a field per product.
    Hash,
}

/// Configuration for the cache coordinator.
///
/// Built once at startup and shared immutably.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Key prefix for every entry written by the coordinator.
    pub namespace: String,

    /// Time-to-live applied to every cache write.
    pub ttl: Duration,

    /// Maximum number of entries in the in-process backend.
    pub max_capacity: u64,

    pub layout: CacheLayout,

    /// Backfill `<ns>:<id>` when a by-id read is answered from `<ns>:all`.
    pub eager_id_fill: bool,

    /// On update, write the fresh product into its per-id entry instead of
    /// deleting it.
    pub write_through_updates: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "product".to_string(),
            ttl: Duration::from_secs(600), // 10 minutes
            max_capacity: 10_000,
            layout: CacheLayout::Value,
            eager_id_fill: false,
            write_through_updates: false,
        }
    }
}

impl CacheConfig {
    /// Set the key namespace (builder pattern).
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set time-to-live for cache entries, clamped to [`MIN_TTL`].
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = duration.max(MIN_TTL);
        self
    }

    /// Set max capacity for the in-process backend.
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: CacheLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn eager_id_fill(mut self, enabled: bool) -> Self {
        self.eager_id_fill = enabled;
        self
    }

    #[must_use]
    pub fn write_through_updates(mut self, enabled: bool) -> Self {
        self.write_through_updates = enabled;
        self
    }
}
