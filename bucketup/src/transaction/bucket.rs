use crate::errors::BucketupResult;
use crate::transaction::{Cursor, Transaction};

/// A named collection of key/value pairs, seen through one transaction.
///
/// A `Bucket` borrows the transaction that produced it and cannot outlive it.
/// Every read reflects the transaction's own buffered writes.
///
/// # Usage
/// ```rust
/// use bucketup::store::memory::InMemoryStore;
/// use bucketup::store::Store;
/// use bucketup::transaction::TxOperations;
///
/// let store = Store::open(InMemoryStore::new()).unwrap();
/// let tx = store.begin_write().unwrap();
/// let bucket = tx.create_bucket(b"fruits").unwrap();
/// bucket.put(b"apple", b"red").unwrap();
/// bucket.put(b"banana", b"yellow").unwrap();
///
/// assert_eq!(bucket.get(b"apple").unwrap(), Some(b"red".to_vec()));
/// assert_eq!(bucket.len().unwrap(), 2);
/// tx.commit().unwrap();
/// ```
pub struct Bucket<'tx> {
    tx: &'tx Transaction,
    name: Vec<u8>,
}

impl<'tx> Bucket<'tx> {
    pub(crate) fn new(tx: &'tx Transaction, name: &[u8]) -> Self {
        Bucket {
            tx,
            name: name.to_vec(),
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> BucketupResult<Option<Vec<u8>>> {
        self.tx.get_value(&self.name, key)
    }

    pub fn contains_key(&self, key: &[u8]) -> BucketupResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// * `TransactionNotWritable` in a read transaction
    /// * `KeyRequired`, `KeyTooLarge` or `ValueTooLarge` on invalid input
    pub fn put(&self, key: &[u8], value: &[u8]) -> BucketupResult<()> {
        self.tx.put_value(&self.name, key, value)
    }

    /// Removes `key`. Removing a missing key is not an error.
    pub fn delete(&self, key: &[u8]) -> BucketupResult<()> {
        self.tx.delete_value(&self.name, key)
    }

    /// Opens a cursor over a snapshot of the bucket's entries.
    pub fn cursor(&self) -> BucketupResult<Cursor<'tx>> {
        let entries = self
            .tx
            .bucket_entries(&self.name)?
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect();
        Ok(Cursor::new(self.tx, Some(self.name.clone()), entries))
    }

    /// Calls `f` for every entry in ascending key order. The first error stops
    /// the iteration and is returned.
    pub fn for_each<F>(&self, mut f: F) -> BucketupResult<()>
    where
        F: FnMut(&[u8], &[u8]) -> BucketupResult<()>,
    {
        for (key, value) in self.tx.bucket_entries(&self.name)? {
            f(&key, &value)?;
        }
        Ok(())
    }

    pub fn len(&self) -> BucketupResult<usize> {
        Ok(self.tx.bucket_entries(&self.name)?.len())
    }

    pub fn is_empty(&self) -> BucketupResult<bool> {
        Ok(self.len()? == 0)
    }
}
