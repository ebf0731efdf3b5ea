use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use crate::store::writer_gate::WriterGate;
use crate::store::{ChangeSet, StoreConfig};
use crate::transaction::Transaction;
use std::sync::Arc;

/// Low-level interface for bucket-oriented key-value backends.
///
/// # Purpose
/// A provider hands out point-in-time views of its committed state and applies
/// the buffered changes of a transaction atomically. Transaction semantics
/// (read-your-writes, validation, single writer) live in [`Transaction`] and
/// [`Store`]; providers only need consistent snapshots and an all-or-nothing
/// `apply`.
///
/// # Implementations
/// - `InMemoryStore`: persistent ordered maps held in memory
/// - `FjallStore` (in `bucketup_fjall_adapter`): LSM-tree storage via Fjall
///
/// # Thread Safety
/// Implementers must be `Send + Sync`.
pub trait StoreProvider: Send + Sync {
    /// Opens or creates the underlying storage. Must be called before any
    /// other operation.
    fn open_or_create(&self) -> BucketupResult<()>;

    /// Flushes pending state and closes the storage.
    fn close(&self) -> BucketupResult<()>;

    fn is_closed(&self) -> BucketupResult<bool>;

    /// Captures the committed state as of now. Changes applied afterwards are
    /// not visible through the returned snapshot.
    fn snapshot(&self) -> BucketupResult<Box<dyn StoreSnapshot>>;

    /// Applies every change in `changes` atomically: either all of them become
    /// visible (and durable, for persistent backends) or none of them do.
    fn apply(&self, changes: &ChangeSet) -> BucketupResult<()>;

    /// Describes the backend, e.g. `"in-memory"` or `"fjall/2.6.3"`.
    fn store_version(&self) -> BucketupResult<String>;
}

/// Read-only view of a provider's committed state at a single point in time.
///
/// Every transaction reads through the snapshot taken when it began, so
/// repeated reads inside one transaction agree with each other no matter
/// what other transactions commit in between.
pub trait StoreSnapshot: Send + Sync {
    fn has_bucket(&self, name: &[u8]) -> BucketupResult<bool>;

    /// Bucket names in ascending byte order.
    fn bucket_names(&self) -> BucketupResult<Vec<Vec<u8>>>;

    fn get(&self, bucket: &[u8], key: &[u8]) -> BucketupResult<Option<Vec<u8>>>;

    /// Entries of a bucket in ascending key order.
    fn entries(&self, bucket: &[u8]) -> BucketupResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

#[derive(Clone)]
/// Handle to an opened store.
///
/// Uses PIMPL pattern with `Arc<StoreInner>`; clones share the provider,
/// the configuration and the single-writer gate.
///
/// # Usage
/// ```rust
/// use bucketup::store::memory::InMemoryStore;
/// use bucketup::store::Store;
/// use bucketup::transaction::TxOperations;
///
/// # fn main() -> bucketup::errors::BucketupResult<()> {
/// let store = Store::open(InMemoryStore::new())?;
/// store.update(|tx| {
///     let bucket = tx.create_bucket(b"users")?;
///     bucket.put(b"alice", b"admin")
/// })?;
///
/// let role = store.view(|tx| match tx.bucket(b"users")? {
///     Some(bucket) => bucket.get(b"alice"),
///     None => Ok(None),
/// })?;
/// assert_eq!(role, Some(b"admin".to_vec()));
/// # Ok(())
/// # }
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    provider: Box<dyn StoreProvider>,
    config: StoreConfig,
    writer_gate: WriterGate,
}

impl Store {
    /// Wraps a provider with the given configuration. The provider is expected
    /// to be opened already; see [`Store::open`] and [`Store::open_with_config`].
    pub fn new<T: StoreProvider + 'static>(provider: T, config: StoreConfig) -> Store {
        Store {
            inner: Arc::new(StoreInner {
                provider: Box::new(provider),
                config,
                writer_gate: WriterGate::new(),
            }),
        }
    }

    /// Opens the provider with a default configuration.
    pub fn open<T: StoreProvider + 'static>(provider: T) -> BucketupResult<Store> {
        Store::open_with_config(provider, StoreConfig::new())
    }

    /// Opens the provider and wraps it with `config`.
    pub fn open_with_config<T: StoreProvider + 'static>(
        provider: T,
        config: StoreConfig,
    ) -> BucketupResult<Store> {
        provider.open_or_create()?;
        log::debug!("Opened store {}", provider.store_version()?);
        Ok(Store::new(provider, config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub(crate) fn provider(&self) -> &dyn StoreProvider {
        self.inner.provider.as_ref()
    }

    /// Begins a transaction.
    ///
    /// A writable transaction waits for the store's writer lock, honouring
    /// [`StoreConfig::writer_timeout`]. Read transactions never wait. Either
    /// kind reads from a snapshot of the state committed when it began.
    pub fn begin(&self, writable: bool) -> BucketupResult<Transaction> {
        self.check_opened()?;

        if !writable {
            let snapshot = self.inner.provider.snapshot()?;
            return Ok(Transaction::new(self.clone(), snapshot, None));
        }

        if self.inner.config.is_read_only() {
            return Err(BucketupError::new(
                "Cannot begin a write transaction on a read-only store",
                ErrorKind::StoreReadOnly,
            ));
        }

        let permit = self
            .inner
            .writer_gate
            .acquire(self.inner.config.writer_timeout())?;
        // taken under the permit so the writer sees every earlier commit
        let snapshot = self.inner.provider.snapshot()?;
        Ok(Transaction::new(self.clone(), snapshot, Some(permit)))
    }

    pub fn begin_read(&self) -> BucketupResult<Transaction> {
        self.begin(false)
    }

    pub fn begin_write(&self) -> BucketupResult<Transaction> {
        self.begin(true)
    }

    /// Runs `f` inside a read transaction, which is always rolled back.
    pub fn view<R, F>(&self, f: F) -> BucketupResult<R>
    where
        F: FnOnce(&Transaction) -> BucketupResult<R>,
    {
        let tx = self.begin_read()?;
        let result = f(&tx);
        tx.rollback()?;
        result
    }

    /// Runs `f` inside a write transaction. The transaction commits when `f`
    /// returns `Ok` and rolls back otherwise.
    pub fn update<R, F>(&self, f: F) -> BucketupResult<R>
    where
        F: FnOnce(&Transaction) -> BucketupResult<R>,
    {
        let tx = self.begin_write()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback()?;
                Err(err)
            }
        }
    }

    pub fn is_closed(&self) -> BucketupResult<bool> {
        self.inner.provider.is_closed()
    }

    /// Closes the underlying provider. Closing twice is a no-op.
    pub fn close(&self) -> BucketupResult<()> {
        if self.inner.provider.is_closed()? {
            return Ok(());
        }
        self.inner.provider.close()
    }

    pub fn store_version(&self) -> BucketupResult<String> {
        self.inner.provider.store_version()
    }

    fn check_opened(&self) -> BucketupResult<()> {
        if self.inner.provider.is_closed()? {
            return Err(BucketupError::new(
                "Store is already closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::transaction::TxOperations;
    use std::thread;
    use std::time::Duration;

    fn open_store() -> Store {
        Store::open(InMemoryStore::new()).expect("Failed to open store")
    }

    #[test]
    fn test_open_reports_store_version() {
        let store = open_store();
        assert_eq!(store.store_version().unwrap(), "in-memory");
        assert!(!store.is_closed().unwrap());
    }

    #[test]
    fn test_update_commits_on_success() {
        let store = open_store();
        store
            .update(|tx| {
                tx.create_bucket(b"test")?;
                Ok(())
            })
            .unwrap();

        let exists = store.view(|tx| Ok(tx.bucket(b"test")?.is_some())).unwrap();
        assert!(exists);
    }

    #[test]
    fn test_update_rolls_back_on_error() {
        let store = open_store();
        let result: BucketupResult<()> = store.update(|tx| {
            tx.create_bucket(b"test")?;
            Err(BucketupError::new("boom", ErrorKind::InternalError))
        });
        assert_eq!(result.unwrap_err().message(), "boom");

        let exists = store.view(|tx| Ok(tx.bucket(b"test")?.is_some())).unwrap();
        assert!(!exists);
    }

    #[test]
    fn test_view_rejects_writes() {
        let store = open_store();
        let err = store
            .view(|tx| tx.create_bucket(b"test").map(|_| ()))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TransactionNotWritable);
    }

    #[test]
    fn test_read_only_store_rejects_write_transactions() {
        let store = Store::open_with_config(
            InMemoryStore::new(),
            StoreConfig::new().with_read_only(true),
        )
        .unwrap();

        let err = store.begin_write().err().expect("write should be rejected");
        assert_eq!(err.kind(), &ErrorKind::StoreReadOnly);
        assert!(store.begin_read().is_ok());
    }

    #[test]
    fn test_closed_store_rejects_transactions() {
        let store = open_store();
        store.close().unwrap();
        store.close().unwrap();

        let err = store.begin_read().err().expect("closed store should fail");
        assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
    }

    #[test]
    fn test_writer_timeout_while_another_writer_is_active() {
        let store = Store::open_with_config(
            InMemoryStore::new(),
            StoreConfig::new().with_writer_timeout(Duration::from_millis(20)),
        )
        .unwrap();

        let first = store.begin_write().unwrap();
        let err = store.begin_write().err().expect("second writer should time out");
        assert_eq!(err.kind(), &ErrorKind::WriterTimeout);

        // readers are never blocked by the writer
        assert!(store.begin_read().is_ok());

        first.rollback().unwrap();
        assert!(store.begin_write().is_ok());
    }

    #[test]
    fn test_blocked_writer_sees_committed_state() {
        let store = open_store();
        let first = store.begin_write().unwrap();
        first.create_bucket(b"test").unwrap();

        let cloned = store.clone();
        let waiter = thread::spawn(move || {
            cloned
                .view(|_| Ok(()))
                .and_then(|_| cloned.update(|tx| Ok(tx.bucket(b"test")?.is_some())))
        });

        thread::sleep(Duration::from_millis(20));
        first.commit().unwrap();

        assert!(waiter.join().unwrap().unwrap());
    }
}
