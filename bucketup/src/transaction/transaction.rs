use crate::common::{display_bytes, validate_bucket_name, validate_key, validate_value};
use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use crate::store::writer_gate::WriterPermit;
use crate::store::{ChangeSet, Store, StoreSnapshot};
use crate::transaction::{Bucket, Cursor, TxOperations};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use uuid::Uuid;

/// State of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is accepting operations
    Active,
    /// All changes were applied to the store
    Committed,
    /// Changes were discarded
    RolledBack,
    /// Commit was attempted and failed; nothing was applied
    Failed,
}

/// A unit of reads and writes against a [`Store`].
///
/// # Characteristics
/// - **Buffered**: writes are kept in a [`ChangeSet`] until `commit`, so a
///   transaction that never commits leaves committed state untouched
/// - **Read-your-writes**: reads merge buffered writes over committed state
/// - **Repeatable reads**: committed state is read from the snapshot taken
///   when the transaction began, so commits made by others meanwhile stay
///   invisible
/// - **Single writer**: a writable transaction holds the store's writer lock
///   until it commits, rolls back or is dropped
/// - **Drop rolls back**: an active transaction that goes out of scope is
///   rolled back
///
/// `commit` and `rollback` consume the transaction, so a transaction can be
/// resolved only once.
pub struct Transaction {
    id: String,
    store: Store,
    writable: bool,
    snapshot: Box<dyn StoreSnapshot>,
    state: Mutex<TransactionState>,
    changes: Mutex<ChangeSet>,
    permit: Mutex<Option<WriterPermit>>,
}

impl Transaction {
    pub(crate) fn new(
        store: Store,
        snapshot: Box<dyn StoreSnapshot>,
        permit: Option<WriterPermit>,
    ) -> Self {
        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            store,
            writable: permit.is_some(),
            snapshot,
            state: Mutex::new(TransactionState::Active),
            changes: Mutex::new(ChangeSet::new()),
            permit: Mutex::new(permit),
        };
        log::debug!(
            "Began {} transaction {}",
            if tx.writable { "write" } else { "read" },
            tx.id
        );
        tx
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Number of buckets touched by buffered writes.
    pub fn pending_buckets(&self) -> usize {
        self.changes.lock().len()
    }

    /// Applies all buffered changes to the store.
    ///
    /// # Errors
    /// * `TransactionNotWritable` for read transactions
    /// * `TransactionClosed` if already resolved
    /// * whatever the store provider reports; the transaction is then `Failed`
    ///   and no change was applied
    pub fn commit(self) -> BucketupResult<()> {
        self.check_active()?;
        if !self.writable {
            return Err(BucketupError::new(
                "Cannot commit a read-only transaction",
                ErrorKind::TransactionNotWritable,
            ));
        }

        let changes = std::mem::take(&mut *self.changes.lock());
        let result = if changes.is_empty() {
            Ok(())
        } else {
            self.store.provider().apply(&changes)
        };

        match result {
            Ok(_) => {
                self.finish(TransactionState::Committed);
                log::debug!(
                    "Committed transaction {} ({} buckets changed)",
                    self.id,
                    changes.len()
                );
                Ok(())
            }
            Err(err) => {
                self.finish(TransactionState::Failed);
                log::error!("Failed to commit transaction {}: {}", self.id, err);
                Err(err)
            }
        }
    }

    /// Discards all buffered changes.
    pub fn rollback(self) -> BucketupResult<()> {
        self.check_active()?;
        self.rollback_inner();
        Ok(())
    }

    fn rollback_inner(&self) {
        self.changes.lock().clear();
        self.finish(TransactionState::RolledBack);
        log::debug!("Rolled back transaction {}", self.id);
    }

    fn finish(&self, state: TransactionState) {
        *self.state.lock() = state;
        // releases the writer lock
        self.permit.lock().take();
    }

    fn check_active(&self) -> BucketupResult<()> {
        match self.state() {
            TransactionState::Active => Ok(()),
            state => Err(BucketupError::new(
                &format!("Transaction {} is no longer active ({:?})", self.id, state),
                ErrorKind::TransactionClosed,
            )),
        }
    }

    fn check_writable(&self) -> BucketupResult<()> {
        self.check_active()?;
        if !self.writable {
            return Err(BucketupError::new(
                "Transaction is read-only",
                ErrorKind::TransactionNotWritable,
            ));
        }
        Ok(())
    }

    pub(crate) fn has_bucket(&self, name: &[u8]) -> BucketupResult<bool> {
        self.check_active()?;
        if let Some(change) = self.changes.lock().bucket(name) {
            return Ok(change.exists());
        }
        self.snapshot.has_bucket(name)
    }

    fn require_bucket(&self, name: &[u8]) -> BucketupResult<()> {
        if self.has_bucket(name)? {
            Ok(())
        } else {
            Err(BucketupError::new(
                &format!("Bucket {} not found", display_bytes(name)),
                ErrorKind::BucketNotFound,
            ))
        }
    }

    pub(crate) fn list_buckets(&self) -> BucketupResult<Vec<Vec<u8>>> {
        self.check_active()?;
        let mut names: BTreeSet<Vec<u8>> =
            self.snapshot.bucket_names()?.into_iter().collect();
        for (name, change) in self.changes.lock().iter() {
            if change.exists() {
                names.insert(name.clone());
            } else {
                names.remove(name);
            }
        }
        Ok(names.into_iter().collect())
    }

    pub(crate) fn get_value(&self, bucket: &[u8], key: &[u8]) -> BucketupResult<Option<Vec<u8>>> {
        self.require_bucket(bucket)?;
        if let Some(change) = self.changes.lock().bucket(bucket) {
            if let Some(buffered) = change.lookup(key) {
                return Ok(buffered.map(|value| value.to_vec()));
            }
        }
        self.snapshot.get(bucket, key)
    }

    pub(crate) fn bucket_entries(&self, bucket: &[u8]) -> BucketupResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.require_bucket(bucket)?;
        let changes = self.changes.lock();
        match changes.bucket(bucket) {
            Some(change) if change.truncated() => {
                Ok(change.merge(Vec::new()).into_iter().collect())
            }
            Some(change) => {
                let committed = self.snapshot.entries(bucket)?;
                Ok(change.merge(committed).into_iter().collect())
            }
            None => self.snapshot.entries(bucket),
        }
    }

    pub(crate) fn put_value(&self, bucket: &[u8], key: &[u8], value: &[u8]) -> BucketupResult<()> {
        self.check_writable()?;
        validate_key(key)?;
        validate_value(value)?;
        self.require_bucket(bucket)?;
        self.changes
            .lock()
            .bucket_mut(bucket)
            .put(key.to_vec(), value.to_vec());
        Ok(())
    }

    pub(crate) fn delete_value(&self, bucket: &[u8], key: &[u8]) -> BucketupResult<()> {
        self.check_writable()?;
        validate_key(key)?;
        self.require_bucket(bucket)?;
        self.changes.lock().bucket_mut(bucket).delete(key.to_vec());
        Ok(())
    }
}

impl TxOperations for Transaction {
    fn bucket(&self, name: &[u8]) -> BucketupResult<Option<Bucket<'_>>> {
        validate_bucket_name(name)?;
        if self.has_bucket(name)? {
            Ok(Some(Bucket::new(self, name)))
        } else {
            Ok(None)
        }
    }

    fn create_bucket(&self, name: &[u8]) -> BucketupResult<Bucket<'_>> {
        self.check_writable()?;
        validate_bucket_name(name)?;
        if self.has_bucket(name)? {
            return Err(BucketupError::new(
                &format!("Bucket {} already exists", display_bytes(name)),
                ErrorKind::BucketAlreadyExists,
            ));
        }
        self.changes.lock().create_bucket(name);
        Ok(Bucket::new(self, name))
    }

    fn create_bucket_if_not_exists(&self, name: &[u8]) -> BucketupResult<Bucket<'_>> {
        self.check_writable()?;
        validate_bucket_name(name)?;
        if !self.has_bucket(name)? {
            self.changes.lock().create_bucket(name);
        }
        Ok(Bucket::new(self, name))
    }

    fn delete_bucket(&self, name: &[u8]) -> BucketupResult<()> {
        self.check_writable()?;
        validate_bucket_name(name)?;
        self.require_bucket(name)?;
        self.changes.lock().drop_bucket(name);
        Ok(())
    }

    fn cursor(&self) -> BucketupResult<Cursor<'_>> {
        let entries = self
            .list_buckets()?
            .into_iter()
            .map(|name| (name, None))
            .collect();
        Ok(Cursor::new(self, None, entries))
    }

    fn for_each<F>(&self, mut f: F) -> BucketupResult<()>
    where
        F: FnMut(&[u8], Bucket<'_>) -> BucketupResult<()>,
    {
        for name in self.list_buckets()? {
            f(&name, Bucket::new(self, &name))?;
        }
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state() == TransactionState::Active {
            self.rollback_inner();
        }
    }
}
