use crate::common::{MAX_BUCKET_NAME_SIZE, MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::errors::{BucketupError, BucketupResult, ErrorKind};

pub(crate) fn validate_bucket_name(name: &[u8]) -> BucketupResult<()> {
    if name.is_empty() {
        return Err(BucketupError::new(
            "Bucket name required",
            ErrorKind::InvalidBucketName,
        ));
    }
    if name.len() > MAX_BUCKET_NAME_SIZE {
        return Err(BucketupError::new(
            &format!(
                "Bucket name is {} bytes, the limit is {}",
                name.len(),
                MAX_BUCKET_NAME_SIZE
            ),
            ErrorKind::InvalidBucketName,
        ));
    }
    Ok(())
}

pub(crate) fn validate_key(key: &[u8]) -> BucketupResult<()> {
    if key.is_empty() {
        return Err(BucketupError::new("Key required", ErrorKind::KeyRequired));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(BucketupError::new(
            &format!("Key is {} bytes, the limit is {}", key.len(), MAX_KEY_SIZE),
            ErrorKind::KeyTooLarge,
        ));
    }
    Ok(())
}

pub(crate) fn validate_value(value: &[u8]) -> BucketupResult<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(BucketupError::new(
            &format!("Value is {} bytes, the limit is {}", value.len(), MAX_VALUE_SIZE),
            ErrorKind::ValueTooLarge,
        ));
    }
    Ok(())
}

/// Renders raw bucket or key bytes for log and error messages.
pub(crate) fn display_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name(b"users").is_ok());

        let err = validate_bucket_name(b"").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidBucketName);

        let long = vec![b'a'; MAX_BUCKET_NAME_SIZE + 1];
        let err = validate_bucket_name(&long).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidBucketName);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key(b"k").is_ok());
        assert!(validate_key(&vec![0u8; MAX_KEY_SIZE]).is_ok());
        assert_eq!(validate_key(b"").unwrap_err().kind(), &ErrorKind::KeyRequired);
        assert_eq!(
            validate_key(&vec![0u8; MAX_KEY_SIZE + 1]).unwrap_err().kind(),
            &ErrorKind::KeyTooLarge
        );
    }

    #[test]
    fn test_validate_value_accepts_empty() {
        assert!(validate_value(b"").is_ok());
        assert!(validate_value(b"payload").is_ok());
    }

    #[test]
    fn test_display_bytes_is_lossy() {
        assert_eq!(display_bytes(b"test"), "test");
        assert_eq!(display_bytes(&[0xff]), "\u{fffd}");
    }
}
