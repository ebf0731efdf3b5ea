use bucketup::errors::{BucketupError, ErrorKind};
use thiserror::Error;

const LENGTH_PREFIX: usize = 4;

/// Errors raised while decoding keys of the `entries` partition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FjallKeyError {
    /// The key is shorter than its length prefix
    #[error("Entry key of {0} bytes has no length prefix")]
    MissingPrefix(usize),
    /// The length prefix points past the end of the key
    #[error("Entry key declares a {declared} byte bucket name but has only {available} bytes left")]
    TruncatedName { declared: usize, available: usize },
    /// The key belongs to another bucket
    #[error("Entry key does not belong to the requested bucket")]
    ForeignBucket,
}

impl From<FjallKeyError> for BucketupError {
    fn from(err: FjallKeyError) -> Self {
        BucketupError::new(&err.to_string(), ErrorKind::EncodingError)
    }
}

/// Key prefix shared by every entry of `bucket`: the name length as a
/// big-endian u32 followed by the name.
pub(crate) fn bucket_prefix(bucket: &[u8]) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(LENGTH_PREFIX + bucket.len());
    prefix.extend_from_slice(&(bucket.len() as u32).to_be_bytes());
    prefix.extend_from_slice(bucket);
    prefix
}

/// Key of `key` inside `bucket` in the `entries` partition.
pub(crate) fn entry_key(bucket: &[u8], key: &[u8]) -> Vec<u8> {
    let mut composite = bucket_prefix(bucket);
    composite.extend_from_slice(key);
    composite
}

/// Splits an `entries` key into bucket name and key.
pub(crate) fn split_entry_key(composite: &[u8]) -> Result<(&[u8], &[u8]), FjallKeyError> {
    if composite.len() < LENGTH_PREFIX {
        return Err(FjallKeyError::MissingPrefix(composite.len()));
    }
    let (length, rest) = composite.split_at(LENGTH_PREFIX);
    let declared = u32::from_be_bytes([length[0], length[1], length[2], length[3]]) as usize;
    if declared > rest.len() {
        return Err(FjallKeyError::TruncatedName {
            declared,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(declared))
}

/// Returns the user key of `composite` if it belongs to `bucket`.
pub(crate) fn user_key<'a>(bucket: &[u8], composite: &'a [u8]) -> Result<&'a [u8], FjallKeyError> {
    let (name, key) = split_entry_key(composite)?;
    if name != bucket {
        return Err(FjallKeyError::ForeignBucket);
    }
    Ok(key)
}
