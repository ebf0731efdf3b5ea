use crate::config::{available_cpus, FjallConfig};
use crate::store::FjallStore;
use bucketup::errors::BucketupResult;
use bucketup::store::{Store, StoreConfig};
use fjall::CompressionType;
use std::time::Duration;

/// Builder for a Fjall-backed [`Store`].
///
/// Combines the Fjall settings with the store-level options
/// (writer timeout, read-only mode). Presets can be applied first and
/// individual settings overridden afterwards.
///
/// ```rust,no_run
/// use bucketup_fjall_adapter::FjallStore;
///
/// # fn main() -> bucketup::errors::BucketupResult<()> {
/// let store = FjallStore::with_config()
///     .production_preset()
///     .db_path("/path/to/db")
///     .build()?;
/// # store.close()
/// # }
/// ```
pub struct FjallStoreBuilder {
    fjall_config: FjallConfig,
    store_config: StoreConfig,
}

impl FjallStoreBuilder {
    #[inline]
    pub fn new() -> FjallStoreBuilder {
        FjallStoreBuilder {
            fjall_config: FjallConfig::new(),
            store_config: StoreConfig::new(),
        }
    }

    /// Settings for long running services: a 320 MB cache, one flush worker
    /// per core and half as many compaction workers, LZ4 compression.
    #[inline]
    pub fn production_preset(self) -> Self {
        let cpus = available_cpus();
        self.cache_size(320 * 1024 * 1024)
            .flush_workers(cpus)
            .compaction_workers(cpus / 2)
            .compression_type(CompressionType::Lz4)
    }

    /// A 24 MB cache and a single worker of each kind. Meant for tests,
    /// command line tools and other short lived processes.
    #[inline]
    pub fn low_memory_preset(self) -> Self {
        self.cache_size(24 * 1024 * 1024)
            .flush_workers(1)
            .compaction_workers(1)
    }

    #[inline]
    pub fn db_path(self, db_path: &str) -> Self {
        self.fjall_config.set_db_path(db_path);
        self
    }

    /// Makes every commit wait until its journal entry is synced to disk.
    /// Enabled by default.
    #[inline]
    pub fn sync_on_commit(self, sync_on_commit: bool) -> Self {
        self.fjall_config.set_sync_on_commit(sync_on_commit);
        self
    }

    #[inline]
    pub fn cache_size(self, cache_size: u64) -> Self {
        self.fjall_config.set_cache_size(cache_size);
        self
    }

    #[inline]
    pub fn compression_type(self, compression_type: CompressionType) -> Self {
        self.fjall_config.set_compression_type(compression_type);
        self
    }

    /// Worker counts are raised to at least one.
    #[inline]
    pub fn flush_workers(self, flush_workers: usize) -> Self {
        self.fjall_config.set_flush_workers(flush_workers);
        self
    }

    #[inline]
    pub fn compaction_workers(self, compaction_workers: usize) -> Self {
        self.fjall_config.set_compaction_workers(compaction_workers);
        self
    }

    /// Gives up waiting for the writer lock after `timeout`.
    #[inline]
    pub fn writer_timeout(self, timeout: Duration) -> Self {
        self.store_config.set_writer_timeout(Some(timeout));
        self
    }

    #[inline]
    pub fn read_only(self, read_only: bool) -> Self {
        self.store_config.set_read_only(read_only);
        self
    }

    pub fn fjall_config(&self) -> &FjallConfig {
        &self.fjall_config
    }

    /// Returns the provider without opening it.
    #[inline]
    pub fn build_provider(self) -> FjallStore {
        FjallStore::new(self.fjall_config)
    }

    /// Opens (or creates) the keyspace and returns a ready [`Store`].
    pub fn build(self) -> BucketupResult<Store> {
        let provider = FjallStore::new(self.fjall_config);
        Store::open_with_config(provider, self.store_config)
    }
}

impl Default for FjallStoreBuilder {
    fn default() -> Self {
        FjallStoreBuilder::new()
    }
}
