use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Buffered mutations of a single bucket within one transaction.
///
/// # Characteristics
/// - `exists` is the bucket's existence once the transaction commits
/// - `truncated` means the committed contents of the bucket are discarded
///   before `writes` are applied (the bucket was dropped or freshly created
///   inside the transaction)
/// - `writes` holds the latest write per key; `None` marks a deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketChange {
    exists: bool,
    truncated: bool,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl BucketChange {
    /// Change record for a bucket that already exists in committed state.
    pub(crate) fn existing() -> Self {
        BucketChange {
            exists: true,
            truncated: false,
            writes: BTreeMap::new(),
        }
    }

    /// Change record for a bucket created inside the transaction.
    pub(crate) fn created() -> Self {
        BucketChange {
            exists: true,
            truncated: true,
            writes: BTreeMap::new(),
        }
    }

    /// Change record for a bucket dropped inside the transaction.
    pub(crate) fn dropped() -> Self {
        BucketChange {
            exists: false,
            truncated: true,
            writes: BTreeMap::new(),
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn writes(&self) -> &BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        &self.writes
    }

    /// Looks up a buffered write. The outer `Option` tells whether this change
    /// knows anything about the key at all.
    pub(crate) fn lookup(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        if let Some(write) = self.writes.get(key) {
            return Some(write.as_deref());
        }
        if self.truncated {
            return Some(None);
        }
        None
    }

    pub(crate) fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    pub(crate) fn delete(&mut self, key: Vec<u8>) {
        if self.truncated {
            // nothing committed to hide, forget the pending write instead
            self.writes.remove(&key);
        } else {
            self.writes.insert(key, None);
        }
    }

    /// Overlays the buffered writes on top of committed entries.
    pub(crate) fn merge(
        &self,
        committed: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> BTreeMap<Vec<u8>, Vec<u8>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = if self.truncated {
            BTreeMap::new()
        } else {
            committed.into_iter().collect()
        };

        for (key, write) in &self.writes {
            match write {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged
    }
}

/// All buffered mutations of one transaction, keyed by bucket name.
///
/// A `ChangeSet` is what a [`StoreProvider`](crate::store::StoreProvider) receives
/// on commit; providers must apply it atomically. For every bucket:
/// 1. if `truncated`, remove all committed entries of the bucket
/// 2. if `exists`, make sure the bucket is registered and apply `writes`
/// 3. otherwise, unregister the bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    buckets: BTreeMap<Vec<u8>, BucketChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, name: &[u8]) -> Option<&BucketChange> {
        self.buckets.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &BucketChange)> {
        self.buckets.iter()
    }

    pub(crate) fn create_bucket(&mut self, name: &[u8]) {
        match self.buckets.entry(name.to_vec()) {
            Entry::Occupied(mut entry) => {
                // dropped earlier in this transaction, comes back empty
                let change = entry.get_mut();
                change.exists = true;
                change.truncated = true;
                change.writes.clear();
            }
            Entry::Vacant(entry) => {
                entry.insert(BucketChange::created());
            }
        }
    }

    pub(crate) fn drop_bucket(&mut self, name: &[u8]) {
        self.buckets.insert(name.to_vec(), BucketChange::dropped());
    }

    /// Returns the change record of an existing bucket, creating one that
    /// layers over committed state when the bucket has not been touched yet.
    pub(crate) fn bucket_mut(&mut self, name: &[u8]) -> &mut BucketChange {
        self.buckets
            .entry(name.to_vec())
            .or_insert_with(BucketChange::existing)
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
    }
}
