use crate::common::{MIGRATIONS_BUCKET, VERSION_KEY, VERSION_WIDTH};
use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use crate::store::Store;
use crate::transaction::{Bucket, TxOperations};

/// Encodes a schema version as 8 big-endian bytes.
pub fn encode_version(version: u64) -> [u8; VERSION_WIDTH] {
    version.to_be_bytes()
}

/// Decodes a schema version stored by [`encode_version`].
///
/// # Errors
/// `EncodingError` if `bytes` is not exactly 8 bytes long.
pub fn decode_version(bytes: &[u8]) -> BucketupResult<u64> {
    let raw: [u8; VERSION_WIDTH] = bytes.try_into().map_err(|_| {
        BucketupError::new(
            &format!(
                "Stored version is {} bytes, expected {}",
                bytes.len(),
                VERSION_WIDTH
            ),
            ErrorKind::EncodingError,
        )
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// The `migrations` bucket of a transaction.
///
/// A `VersionBucket` can only be obtained through [`VersionBucket::ensure`],
/// so the bucket exists in the transaction when the handle is created. If a
/// migration deletes it afterwards, [`VersionBucket::write`] fails with
/// `BucketNotFound`.
pub struct VersionBucket<'tx> {
    bucket: Bucket<'tx>,
}

impl<'tx> VersionBucket<'tx> {
    /// Creates the `migrations` bucket if it is missing. The creation belongs
    /// to `tx` and is undone if `tx` rolls back.
    pub fn ensure<T: TxOperations>(tx: &'tx T) -> BucketupResult<VersionBucket<'tx>> {
        let bucket = tx.create_bucket_if_not_exists(MIGRATIONS_BUCKET)?;
        Ok(VersionBucket { bucket })
    }

    /// Reads the stored version, 0 when none was written yet.
    pub fn read(&self) -> BucketupResult<u64> {
        match self.bucket.get(VERSION_KEY)? {
            Some(bytes) => decode_version(&bytes),
            None => Ok(0),
        }
    }

    pub fn write(&self, version: u64) -> BucketupResult<()> {
        self.bucket.put(VERSION_KEY, &encode_version(version))
    }
}

/// Reads the schema version of `store` without modifying it.
///
/// Returns 0 when the `migrations` bucket or the version key is missing.
pub fn current_version(store: &Store) -> BucketupResult<u64> {
    store.view(|tx| match tx.bucket(MIGRATIONS_BUCKET)? {
        Some(bucket) => match bucket.get(VERSION_KEY)? {
            Some(bytes) => decode_version(&bytes),
            None => Ok(0),
        },
        None => Ok(0),
    })
}
