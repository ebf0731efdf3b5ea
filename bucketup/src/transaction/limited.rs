use crate::errors::BucketupResult;
use crate::transaction::{Bucket, Cursor, Transaction};

/// Bucket-level operations available inside a transaction.
///
/// Implemented by [`Transaction`], which adds `commit` and `rollback` on top,
/// and by [`LimitedTx`], which offers nothing else.
pub trait TxOperations {
    /// Returns the named top-level bucket, or `None` if it does not exist.
    fn bucket(&self, name: &[u8]) -> BucketupResult<Option<Bucket<'_>>>;

    /// Creates a new top-level bucket.
    ///
    /// # Errors
    /// * `BucketAlreadyExists` if the bucket exists
    /// * `InvalidBucketName` if the name is empty or too long
    /// * `TransactionNotWritable` in a read transaction
    fn create_bucket(&self, name: &[u8]) -> BucketupResult<Bucket<'_>>;

    /// Creates the bucket unless it exists, and returns it either way.
    fn create_bucket_if_not_exists(&self, name: &[u8]) -> BucketupResult<Bucket<'_>>;

    /// Deletes a top-level bucket and all of its entries.
    ///
    /// # Errors
    /// * `BucketNotFound` if the bucket does not exist
    fn delete_bucket(&self, name: &[u8]) -> BucketupResult<()>;

    /// Opens a cursor over the top-level bucket names.
    fn cursor(&self) -> BucketupResult<Cursor<'_>>;

    /// Calls `f` for every top-level bucket in ascending name order.
    fn for_each<F>(&self, f: F) -> BucketupResult<()>
    where
        F: FnMut(&[u8], Bucket<'_>) -> BucketupResult<()>;
}

/// A transaction handed to migration callbacks.
///
/// `LimitedTx` forwards every [`TxOperations`] call to the wrapped transaction
/// and offers no way to commit or roll it back; the runner owns the
/// transaction's lifecycle.
///
/// ```rust
/// use bucketup::store::memory::InMemoryStore;
/// use bucketup::store::Store;
/// use bucketup::transaction::{LimitedTx, TxOperations};
///
/// let store = Store::open(InMemoryStore::new()).unwrap();
/// let tx = store.begin_write().unwrap();
/// {
///     let limited = LimitedTx::new(&tx);
///     limited.create_bucket(b"users").unwrap();
/// }
/// tx.commit().unwrap();
/// ```
pub struct LimitedTx<'tx> {
    tx: &'tx Transaction,
}

impl<'tx> LimitedTx<'tx> {
    pub fn new(tx: &'tx Transaction) -> Self {
        LimitedTx { tx }
    }
}

impl TxOperations for LimitedTx<'_> {
    fn bucket(&self, name: &[u8]) -> BucketupResult<Option<Bucket<'_>>> {
        self.tx.bucket(name)
    }

    fn create_bucket(&self, name: &[u8]) -> BucketupResult<Bucket<'_>> {
        self.tx.create_bucket(name)
    }

    fn create_bucket_if_not_exists(&self, name: &[u8]) -> BucketupResult<Bucket<'_>> {
        self.tx.create_bucket_if_not_exists(name)
    }

    fn delete_bucket(&self, name: &[u8]) -> BucketupResult<()> {
        self.tx.delete_bucket(name)
    }

    fn cursor(&self) -> BucketupResult<Cursor<'_>> {
        self.tx.cursor()
    }

    fn for_each<F>(&self, f: F) -> BucketupResult<()>
    where
        F: FnMut(&[u8], Bucket<'_>) -> BucketupResult<()>,
    {
        self.tx.for_each(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::store::memory::InMemoryStore;
    use crate::store::Store;

    fn open_store() -> Store {
        Store::open(InMemoryStore::new()).expect("Failed to open store")
    }

    #[test]
    fn test_limited_tx_forwards_writes_to_transaction() {
        let store = open_store();
        let tx = store.begin_write().unwrap();
        {
            let limited = LimitedTx::new(&tx);
            let bucket = limited.create_bucket(b"test").unwrap();
            bucket.put(b"value", b"1").unwrap();
        }

        let bucket = tx.bucket(b"test").unwrap().unwrap();
        assert_eq!(bucket.get(b"value").unwrap(), Some(b"1".to_vec()));
        tx.commit().unwrap();
    }

    #[test]
    fn test_limited_tx_bucket_operations() {
        let store = open_store();
        let tx = store.begin_write().unwrap();
        let limited = LimitedTx::new(&tx);

        assert!(limited.bucket(b"test").unwrap().is_none());
        limited.create_bucket_if_not_exists(b"test").unwrap();
        limited.create_bucket_if_not_exists(b"test").unwrap();
        assert_eq!(
            limited.create_bucket(b"test").err().unwrap().kind(),
            &ErrorKind::BucketAlreadyExists
        );

        let mut names = Vec::new();
        limited
            .for_each(|name, _| {
                names.push(name.to_vec());
                Ok(())
            })
            .unwrap();
        assert_eq!(names, vec![b"test".to_vec()]);

        let mut cursor = limited.cursor().unwrap();
        assert_eq!(cursor.first(), Some((b"test".to_vec(), None)));

        limited.delete_bucket(b"test").unwrap();
        assert!(limited.bucket(b"test").unwrap().is_none());
    }

    #[test]
    fn test_limited_tx_over_read_transaction_rejects_writes() {
        let store = open_store();
        let tx = store.begin_read().unwrap();
        let limited = LimitedTx::new(&tx);
        assert_eq!(
            limited.create_bucket(b"test").err().unwrap().kind(),
            &ErrorKind::TransactionNotWritable
        );
    }
}
