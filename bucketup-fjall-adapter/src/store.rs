use crate::builder::FjallStoreBuilder;
use crate::config::FjallConfig;
use crate::keys::{bucket_prefix, entry_key, user_key};
use crate::version::fjall_version;
use crate::wrapper::to_bucketup_error;
use bucketup::errors::{BucketupError, BucketupResult, ErrorKind};
use bucketup::store::{BucketChange, ChangeSet, StoreProvider, StoreSnapshot};
use fjall::{Batch, Keyspace, PartitionHandle, PersistMode, Snapshot};
use parking_lot::RwLock;
use std::collections::Bound::{Included, Unbounded};
use std::sync::Arc;

const BUCKETS_PARTITION: &str = "buckets";
const ENTRIES_PARTITION: &str = "entries";

#[derive(Clone)]
/// Fjall-based bucket store.
///
/// A persistent, thread-safe backend on top of a Fjall keyspace. Uses the PIMPL
/// pattern with `Arc<FjallStoreInner>`.
///
/// Layout:
/// - partition `buckets`: one key per bucket name, empty values
/// - partition `entries`: `u32 BE name length | name | key` mapped to the value
///
/// Every commit is written as a single Fjall batch, so it becomes visible
/// atomically. With `sync_on_commit` (the default) the batch carries
/// `PersistMode::SyncAll`, so the journal is synced before the batch is
/// applied and a failed sync leaves nothing visible.
///
/// Usage: created through [`FjallStore::with_config`], or with
/// `FjallStore::new(config)` and passed to `Store::open`.
pub struct FjallStore {
    inner: Arc<FjallStoreInner>,
}

impl FjallStore {
    #[inline]
    pub fn new(config: FjallConfig) -> FjallStore {
        FjallStore {
            inner: Arc::new(FjallStoreInner::new(config)),
        }
    }

    /// Starts a builder for a Fjall-backed [`Store`](bucketup::store::Store).
    #[inline]
    pub fn with_config() -> FjallStoreBuilder {
        FjallStoreBuilder::new()
    }

    pub fn config(&self) -> &FjallConfig {
        &self.inner.config
    }
}

impl StoreProvider for FjallStore {
    fn open_or_create(&self) -> BucketupResult<()> {
        self.inner.open_or_create()
    }

    fn close(&self) -> BucketupResult<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> BucketupResult<bool> {
        Ok(self.inner.handles.read().is_none())
    }

    fn snapshot(&self) -> BucketupResult<Box<dyn StoreSnapshot>> {
        self.inner.with_handles(|handles| {
            // one instant for both partitions keeps names and entries in step
            let instant = handles.keyspace.instant();
            Ok(Box::new(FjallSnapshot {
                buckets: handles.buckets.snapshot_at(instant),
                entries: handles.entries.snapshot_at(instant),
            }) as Box<dyn StoreSnapshot>)
        })
    }

    fn apply(&self, changes: &ChangeSet) -> BucketupResult<()> {
        self.inner.apply(changes)
    }

    fn store_version(&self) -> BucketupResult<String> {
        match fjall_version() {
            Ok(version) => Ok(format!("fjall/{}", version)),
            Err(e) => Err(BucketupError::new(
                &format!("Failed to determine Fjall version: {}", e),
                ErrorKind::BackendError,
            )),
        }
    }
}

struct FjallHandles {
    keyspace: Keyspace,
    buckets: PartitionHandle,
    entries: PartitionHandle,
}

struct FjallStoreInner {
    config: FjallConfig,
    handles: RwLock<Option<FjallHandles>>,
}

impl FjallStoreInner {
    fn new(config: FjallConfig) -> FjallStoreInner {
        FjallStoreInner {
            config,
            handles: RwLock::new(None),
        }
    }

    fn open_or_create(&self) -> BucketupResult<()> {
        let mut handles = self.handles.write();
        if handles.is_some() {
            return Ok(());
        }

        let keyspace = Keyspace::open(self.config.keyspace_config()).map_err(|err| {
            log::error!("Failed to open or create keyspace: {}", err);
            to_bucketup_error(err)
        })?;
        let buckets = keyspace
            .open_partition(BUCKETS_PARTITION, self.config.partition_config())
            .map_err(|err| backend_error("open buckets partition", err))?;
        let entries = keyspace
            .open_partition(ENTRIES_PARTITION, self.config.partition_config())
            .map_err(|err| backend_error("open entries partition", err))?;

        log::debug!("Opened fjall keyspace at {}", self.config.db_path());
        *handles = Some(FjallHandles {
            keyspace,
            buckets,
            entries,
        });
        Ok(())
    }

    fn close(&self) -> BucketupResult<()> {
        // dropping the handles releases the keyspace
        if let Some(handles) = self.handles.write().take() {
            handles
                .keyspace
                .persist(PersistMode::SyncAll)
                .map_err(|err| backend_error("persist keyspace on close", err))?;
            log::debug!("Closed fjall keyspace at {}", self.config.db_path());
        }
        Ok(())
    }

    fn with_handles<R>(
        &self,
        f: impl FnOnce(&FjallHandles) -> BucketupResult<R>,
    ) -> BucketupResult<R> {
        let guard = self.handles.read();
        match guard.as_ref() {
            Some(handles) => f(handles),
            None => Err(BucketupError::new(
                "Fjall store is not open",
                ErrorKind::StoreAlreadyClosed,
            )),
        }
    }

    fn apply(&self, changes: &ChangeSet) -> BucketupResult<()> {
        self.with_handles(|handles| {
            let mut batch = handles
                .keyspace
                .batch()
                .durability(self.config.commit_durability());
            for (name, change) in changes.iter() {
                stage_bucket(handles, &mut batch, name, change)?;
            }

            batch
                .commit()
                .map_err(|err| backend_error("commit batch", err))
        })
    }
}

/// Point-in-time view over both partitions.
struct FjallSnapshot {
    buckets: Snapshot,
    entries: Snapshot,
}

impl StoreSnapshot for FjallSnapshot {
    fn has_bucket(&self, name: &[u8]) -> BucketupResult<bool> {
        self.buckets
            .contains_key(name)
            .map_err(|err| backend_error("check bucket", err.into()))
    }

    fn bucket_names(&self) -> BucketupResult<Vec<Vec<u8>>> {
        let mut names = Vec::new();
        for result in self.buckets.iter() {
            let (name, _) = result.map_err(|err| backend_error("list buckets", err.into()))?;
            names.push(name.to_vec());
        }
        Ok(names)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> BucketupResult<Option<Vec<u8>>> {
        let value = self
            .entries
            .get(entry_key(bucket, key))
            .map_err(|err| backend_error("get value", err.into()))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn entries(&self, bucket: &[u8]) -> BucketupResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let prefix = bucket_prefix(bucket);
        let mut entries = Vec::new();
        for result in self.entries.range((Included(prefix.clone()), Unbounded)) {
            let (composite, value) = result.map_err(|err| backend_error("read entries", err.into()))?;
            if !composite.starts_with(&prefix) {
                break;
            }
            let key = user_key(bucket, &composite)?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}

/// Adds the writes of one bucket to `batch`, touching every key at most once.
fn stage_bucket(
    handles: &FjallHandles,
    batch: &mut Batch,
    name: &[u8],
    change: &BucketChange,
) -> BucketupResult<()> {
    if change.truncated() {
        let prefix = bucket_prefix(name);
        for result in handles.entries.range((Included(prefix.clone()), Unbounded)) {
            let (composite, _) = result.map_err(|err| backend_error("read entries", err))?;
            if !composite.starts_with(&prefix) {
                break;
            }
            let key = user_key(name, &composite)?;
            let rewritten = change.exists() && matches!(change.writes().get(key), Some(Some(_)));
            if !rewritten {
                batch.remove(&handles.entries, composite);
            }
        }
    }

    if !change.exists() {
        batch.remove(&handles.buckets, name.to_vec());
        return Ok(());
    }

    batch.insert(&handles.buckets, name.to_vec(), Vec::<u8>::new());
    for (key, write) in change.writes() {
        match write {
            Some(value) => batch.insert(&handles.entries, entry_key(name, key), value.clone()),
            // truncation above already removed it
            None if change.truncated() => {}
            None => batch.remove(&handles.entries, entry_key(name, key)),
        }
    }
    Ok(())
}

fn backend_error(action: &str, err: fjall::Error) -> BucketupError {
    log::error!("Failed to {}: {}", action, err);
    let cause = to_bucketup_error(err);
    BucketupError::new_with_cause(
        &format!("Failed to {}", action),
        cause.kind().clone(),
        cause,
    )
}
