use bucketup::errors::{BucketupError, ErrorKind};
use std::error::Error;

/// Maps a Fjall (or IO) error to a `BucketupError`, picking the kind from
/// the error message.
pub(crate) fn to_bucketup_error(error: impl Error) -> BucketupError {
    let error_msg = error.to_string();
    let lower = error_msg.to_lowercase();
    let error_kind = if lower.contains("closed") || lower.contains("poisoned") {
        ErrorKind::StoreAlreadyClosed
    } else if lower.contains("corrupt") || lower.contains("decompress") {
        ErrorKind::EncodingError
    } else if lower.contains("permission") || lower.contains("full") {
        ErrorKind::IOError
    } else {
        ErrorKind::BackendError
    };
    BucketupError::new(&format!("Fjall Error: {}", error_msg), error_kind)
}
