use bucketup::common::Shared;
use fjall::{CompressionType, Config, PartitionCreateOptions, PersistMode};

const DEFAULT_CACHE_SIZE: u64 = 64 * 1_024 * 1_024;

/// Settings of a Fjall-backed store.
///
/// Clones share one [`Shared`] slot, so a value set through any clone is seen
/// by all of them. Settings are read when the keyspace is opened, except
/// `sync_on_commit`, which is read on every commit.
#[derive(Clone)]
pub struct FjallConfig {
    settings: Shared<FjallSettings>,
}

#[derive(Clone)]
struct FjallSettings {
    db_path: String,
    sync_on_commit: bool,
    cache_size: u64,
    compression: CompressionType,
    flush_workers: usize,
    compaction_workers: usize,
}

impl FjallConfig {
    /// Defaults: 64 MB cache, LZ4, one flush worker per core, half as many
    /// compaction workers, every commit synced.
    pub fn new() -> FjallConfig {
        let cpus = available_cpus();
        FjallConfig {
            settings: Shared::new(FjallSettings {
                db_path: String::new(),
                sync_on_commit: true,
                cache_size: DEFAULT_CACHE_SIZE,
                compression: CompressionType::Lz4,
                flush_workers: cpus,
                compaction_workers: (cpus / 2).max(1),
            }),
        }
    }

    pub fn db_path(&self) -> String {
        self.settings.read_with(|s| s.db_path.clone())
    }

    /// Whether a commit returns only after its journal entry is synced.
    pub fn sync_on_commit(&self) -> bool {
        self.settings.read_with(|s| s.sync_on_commit)
    }

    /// Size in bytes of the block cache shared by both partitions.
    pub fn cache_size(&self) -> u64 {
        self.settings.read_with(|s| s.cache_size)
    }

    pub fn compression_type(&self) -> CompressionType {
        self.settings.read_with(|s| s.compression.clone())
    }

    pub fn flush_workers(&self) -> usize {
        self.settings.read_with(|s| s.flush_workers)
    }

    pub fn compaction_workers(&self) -> usize {
        self.settings.read_with(|s| s.compaction_workers)
    }

    pub(crate) fn set_db_path(&self, db_path: &str) {
        self.settings.write_with(|s| s.db_path = db_path.to_string())
    }

    pub(crate) fn set_sync_on_commit(&self, sync_on_commit: bool) {
        self.settings.write_with(|s| s.sync_on_commit = sync_on_commit)
    }

    pub(crate) fn set_cache_size(&self, cache_size: u64) {
        self.settings.write_with(|s| s.cache_size = cache_size)
    }

    pub(crate) fn set_compression_type(&self, compression: CompressionType) {
        self.settings.write_with(|s| s.compression = compression)
    }

    pub(crate) fn set_flush_workers(&self, workers: usize) {
        self.settings.write_with(|s| s.flush_workers = workers.max(1))
    }

    pub(crate) fn set_compaction_workers(&self, workers: usize) {
        self.settings.write_with(|s| s.compaction_workers = workers.max(1))
    }

    /// Durability attached to every commit batch.
    pub(crate) fn commit_durability(&self) -> Option<PersistMode> {
        if self.sync_on_commit() {
            Some(PersistMode::SyncAll)
        } else {
            None
        }
    }

    pub(crate) fn keyspace_config(&self) -> Config {
        let settings = self.settings.get();
        Config::new(settings.db_path)
            .cache_size(settings.cache_size)
            .flush_workers(settings.flush_workers)
            .compaction_workers(settings.compaction_workers)
    }

    /// Options for the `buckets` and `entries` partitions.
    pub(crate) fn partition_config(&self) -> PartitionCreateOptions {
        PartitionCreateOptions::default().compression(self.compression_type())
    }
}

impl Default for FjallConfig {
    fn default() -> Self {
        FjallConfig::new()
    }
}

pub(crate) fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FjallConfig::new();
        assert_eq!(config.db_path(), "");
        assert!(config.sync_on_commit());
        assert_eq!(config.cache_size(), 64 * 1_024 * 1_024);
        assert_eq!(config.compression_type(), CompressionType::Lz4);
        assert_eq!(config.flush_workers(), available_cpus());
        assert!(config.compaction_workers() >= 1);
    }

    #[test]
    fn test_sync_on_commit_sets_batch_durability() {
        let config = FjallConfig::new();
        assert!(matches!(
            config.commit_durability(),
            Some(PersistMode::SyncAll)
        ));

        config.set_sync_on_commit(false);
        assert!(config.commit_durability().is_none());
    }

    #[test]
    fn test_worker_counts_never_drop_to_zero() {
        let config = FjallConfig::new();
        config.set_flush_workers(0);
        config.set_compaction_workers(0);
        assert_eq!(config.flush_workers(), 1);
        assert_eq!(config.compaction_workers(), 1);
    }

    #[test]
    fn test_clones_share_settings() {
        let config = FjallConfig::new();
        let clone = config.clone();
        clone.set_db_path("/tmp/bucketup");
        clone.set_cache_size(1_024);
        clone.set_compression_type(CompressionType::None);

        assert_eq!(config.db_path(), "/tmp/bucketup");
        assert_eq!(config.cache_size(), 1_024);
        assert_eq!(config.compression_type(), CompressionType::None);
    }
}
