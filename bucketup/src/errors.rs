use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for bucketup operations
///
/// Each kind describes one category of failure so callers can branch on the
/// cause without parsing messages.
///
/// # Examples
///
/// ```rust
/// use bucketup::errors::{BucketupError, BucketupResult, ErrorKind};
///
/// fn example() -> BucketupResult<()> {
///     Err(BucketupError::new("bucket not found", ErrorKind::BucketNotFound))
/// }
///
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::BucketNotFound);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // IO and Storage Errors
    /// Generic IO error
    IOError,
    /// Error from storage backend
    BackendError,
    /// Stored bytes could not be decoded
    EncodingError,

    // Bucket Errors
    /// Bucket does not exist
    BucketNotFound,
    /// Bucket already exists
    BucketAlreadyExists,
    /// Bucket name is empty or too long
    InvalidBucketName,

    // Key/Value Errors
    /// Key is empty
    KeyRequired,
    /// Key exceeds the maximum key size
    KeyTooLarge,
    /// Value exceeds the maximum value size
    ValueTooLarge,
    /// Operation is not valid for the entry at hand (e.g. deleting a bucket through a cursor)
    IncompatibleValue,
    /// The operation is not valid in the current context
    InvalidOperation,

    // Transaction Errors
    /// Write attempted on a read-only transaction
    TransactionNotWritable,
    /// Transaction is already committed or rolled back
    TransactionClosed,
    /// Timed out waiting for the store's writer lock
    WriterTimeout,

    // Store Errors
    /// Write transaction requested on a read-only store
    StoreReadOnly,
    /// Store has already been closed
    StoreAlreadyClosed,

    // Migration Errors
    /// Persisted version is ahead of the supplied migration list
    VersionMismatch,
    /// A migration callback failed
    MigrationError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::BucketNotFound => write!(f, "Bucket not found"),
            ErrorKind::BucketAlreadyExists => write!(f, "Bucket already exists"),
            ErrorKind::InvalidBucketName => write!(f, "Invalid bucket name"),
            ErrorKind::KeyRequired => write!(f, "Key required"),
            ErrorKind::KeyTooLarge => write!(f, "Key too large"),
            ErrorKind::ValueTooLarge => write!(f, "Value too large"),
            ErrorKind::IncompatibleValue => write!(f, "Incompatible value"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::TransactionNotWritable => write!(f, "Transaction not writable"),
            ErrorKind::TransactionClosed => write!(f, "Transaction closed"),
            ErrorKind::WriterTimeout => write!(f, "Writer timeout"),
            ErrorKind::StoreReadOnly => write!(f, "Store read-only"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::VersionMismatch => write!(f, "Version mismatch"),
            ErrorKind::MigrationError => write!(f, "Migration error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom bucketup error type.
///
/// `BucketupError` carries a message, a kind, an optional cause and the
/// backtrace captured at construction. Wrapping an error with
/// [`BucketupError::new_with_cause`] keeps the original reachable through
/// [`BucketupError::cause`] and [`std::error::Error::source`].
///
/// # Examples
///
/// ```rust
/// use bucketup::errors::{BucketupError, ErrorKind};
/// use std::error::Error;
///
/// let cause = BucketupError::new("disk went away", ErrorKind::IOError);
/// let err = BucketupError::new_with_cause("commit failed", ErrorKind::BackendError, cause);
///
/// assert_eq!(err.to_string(), "commit failed");
/// assert_eq!(err.source().unwrap().to_string(), "disk went away");
/// ```
#[derive(Clone)]
pub struct BucketupError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<BucketupError>>,
    backtrace: Arc<Backtrace>,
}

impl BucketupError {
    /// Creates a new `BucketupError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        BucketupError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `BucketupError` with a cause error.
    ///
    /// The cause is preserved so the chain can be walked for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: BucketupError) -> Self {
        BucketupError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&BucketupError> {
        self.cause.as_deref()
    }

    /// Returns the innermost error of the cause chain, or `self` if there is none.
    pub fn root_cause(&self) -> &BucketupError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }
}

impl Display for BucketupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for BucketupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for BucketupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for bucketup operations.
pub type BucketupResult<T> = Result<T, BucketupError>;

impl From<std::io::Error> for BucketupError {
    fn from(err: std::io::Error) -> Self {
        BucketupError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<std::string::FromUtf8Error> for BucketupError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        BucketupError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::num::ParseIntError> for BucketupError {
    fn from(err: std::num::ParseIntError) -> Self {
        BucketupError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<String> for BucketupError {
    fn from(msg: String) -> Self {
        BucketupError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for BucketupError {
    fn from(msg: &str) -> Self {
        BucketupError::new(msg, ErrorKind::InternalError)
    }
}
