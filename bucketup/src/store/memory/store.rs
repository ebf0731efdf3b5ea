use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use crate::store::{ChangeSet, StoreProvider, StoreSnapshot};
use im::OrdMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Entries = OrdMap<Vec<u8>, Vec<u8>>;
type Buckets = OrdMap<Vec<u8>, Entries>;

/// In-memory implementation of a bucket store.
///
/// # Purpose
/// `InMemoryStore` keeps every bucket in persistent ordered maps. It is meant
/// for tests and for data that does not need to outlive the process.
///
/// # Characteristics
/// - **Atomic commits**: a change set is applied to a copy of the state and
///   swapped in under the write lock, so readers never see half a commit
/// - **Cheap snapshots**: `im::OrdMap` shares structure between copies
/// - **No Persistence**: all data is lost when the store is dropped
///
/// # Usage
/// ```rust
/// use bucketup::store::memory::InMemoryStore;
/// use bucketup::store::Store;
///
/// let store = Store::open(InMemoryStore::new()).unwrap();
/// assert_eq!(store.store_version().unwrap(), "in-memory");
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore::new()
    }
}

impl StoreProvider for InMemoryStore {
    fn open_or_create(&self) -> BucketupResult<()> {
        self.inner.closed.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> BucketupResult<()> {
        self.inner.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_closed(&self) -> BucketupResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }

    fn snapshot(&self) -> BucketupResult<Box<dyn StoreSnapshot>> {
        self.inner.check_opened()?;
        let buckets = self.inner.buckets.read().clone();
        Ok(Box::new(InMemorySnapshot { buckets }))
    }

    fn apply(&self, changes: &ChangeSet) -> BucketupResult<()> {
        self.inner.check_opened()?;
        self.inner.apply(changes);
        Ok(())
    }

    fn store_version(&self) -> BucketupResult<String> {
        Ok("in-memory".to_string())
    }
}

/// Frozen copy of the bucket map. Later commits swap in a new map and leave
/// this one untouched.
struct InMemorySnapshot {
    buckets: Buckets,
}

impl StoreSnapshot for InMemorySnapshot {
    fn has_bucket(&self, name: &[u8]) -> BucketupResult<bool> {
        Ok(self.buckets.contains_key(name))
    }

    fn bucket_names(&self) -> BucketupResult<Vec<Vec<u8>>> {
        Ok(self.buckets.keys().cloned().collect())
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> BucketupResult<Option<Vec<u8>>> {
        Ok(self
            .buckets
            .get(bucket)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn entries(&self, bucket: &[u8]) -> BucketupResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .buckets
            .get(bucket)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

struct InMemoryStoreInner {
    closed: AtomicBool,
    buckets: RwLock<Buckets>,
}

impl InMemoryStoreInner {
    fn new() -> InMemoryStoreInner {
        InMemoryStoreInner {
            closed: AtomicBool::new(false),
            buckets: RwLock::new(OrdMap::new()),
        }
    }

    fn check_opened(&self) -> BucketupResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(BucketupError::new(
                "In-memory store is closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet) {
        let mut guard = self.buckets.write();
        let mut next = guard.clone();

        for (name, change) in changes.iter() {
            if !change.exists() {
                next.remove(name);
                continue;
            }

            let mut entries = if change.truncated() {
                OrdMap::new()
            } else {
                next.get(name).cloned().unwrap_or_default()
            };

            for (key, write) in change.writes() {
                match write {
                    Some(value) => {
                        entries.insert(key.clone(), value.clone());
                    }
                    None => {
                        entries.remove(key);
                    }
                }
            }
            next.insert(name.clone(), entries);
        }

        *guard = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::transaction::TxOperations;

    #[test]
    fn test_new_store_is_empty() {
        let store = InMemoryStore::new();
        store.open_or_create().unwrap();
        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.bucket_names().unwrap().is_empty());
        assert!(!snapshot.has_bucket(b"test").unwrap());
        assert_eq!(snapshot.get(b"test", b"key").unwrap(), None);
        assert!(snapshot.entries(b"test").unwrap().is_empty());
    }

    #[test]
    fn test_close_and_reopen() {
        let store = InMemoryStore::new();
        assert!(!store.is_closed().unwrap());

        store.close().unwrap();
        assert!(store.is_closed().unwrap());
        let err = store.snapshot().err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);

        store.open_or_create().unwrap();
        assert!(!store.is_closed().unwrap());
    }

    #[test]
    fn test_apply_creates_and_writes() {
        let provider = InMemoryStore::new();
        let store = Store::open(provider.clone()).unwrap();
        store
            .update(|tx| {
                let bucket = tx.create_bucket(b"b")?;
                bucket.put(b"2", b"two")?;
                bucket.put(b"1", b"one")
            })
            .unwrap();

        let snapshot = provider.snapshot().unwrap();
        assert_eq!(snapshot.bucket_names().unwrap(), vec![b"b".to_vec()]);
        assert_eq!(
            snapshot.entries(b"b").unwrap(),
            vec![
                (b"1".to_vec(), b"one".to_vec()),
                (b"2".to_vec(), b"two".to_vec())
            ]
        );
    }

    #[test]
    fn test_apply_deletes_and_drops() {
        let provider = InMemoryStore::new();
        let store = Store::open(provider.clone()).unwrap();
        store
            .update(|tx| {
                tx.create_bucket(b"keep")?.put(b"k", b"v")?;
                tx.create_bucket(b"drop")?.put(b"k", b"v")
            })
            .unwrap();

        store
            .update(|tx| {
                tx.delete_bucket(b"drop")?;
                match tx.bucket(b"keep")? {
                    Some(bucket) => bucket.delete(b"k"),
                    None => Ok(()),
                }
            })
            .unwrap();

        let snapshot = provider.snapshot().unwrap();
        assert!(!snapshot.has_bucket(b"drop").unwrap());
        assert!(snapshot.has_bucket(b"keep").unwrap());
        assert_eq!(snapshot.get(b"keep", b"k").unwrap(), None);
    }

    #[test]
    fn test_snapshot_ignores_later_commits() {
        let provider = InMemoryStore::new();
        let store = Store::open(provider.clone()).unwrap();
        store
            .update(|tx| tx.create_bucket(b"test")?.put(b"k", b"1"))
            .unwrap();

        let snapshot = provider.snapshot().unwrap();
        store
            .update(|tx| {
                tx.delete_bucket(b"test")?;
                tx.create_bucket(b"other").map(|_| ())
            })
            .unwrap();

        assert_eq!(snapshot.bucket_names().unwrap(), vec![b"test".to_vec()]);
        assert_eq!(snapshot.get(b"test", b"k").unwrap(), Some(b"1".to_vec()));
        assert!(!provider.snapshot().unwrap().has_bucket(b"test").unwrap());
    }

    #[test]
    fn test_clones_share_state() {
        let provider = InMemoryStore::new();
        let clone = provider.clone();
        let store = Store::open(provider).unwrap();
        store
            .update(|tx| tx.create_bucket(b"test").map(|_| ()))
            .unwrap();

        assert!(clone.snapshot().unwrap().has_bucket(b"test").unwrap());
    }
}
