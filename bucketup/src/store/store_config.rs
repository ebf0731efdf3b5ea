use crate::common::Shared;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
/// Store-level configuration shared by every backend.
///
/// Uses the PIMPL pattern with `Arc<StoreConfigInner>`, so clones observe the
/// same settings.
///
/// Settings:
/// - `writer_timeout`: how long `begin(true)` waits for the writer lock.
///   `None` (the default) waits until the current writer finishes.
/// - `read_only`: rejects write transactions with `StoreReadOnly`.
pub struct StoreConfig {
    inner: Arc<StoreConfigInner>,
}

impl StoreConfig {
    #[inline]
    pub fn new() -> StoreConfig {
        StoreConfig {
            inner: Arc::new(StoreConfigInner::new()),
        }
    }

    /// Sets the writer timeout and returns the config for chaining.
    pub fn with_writer_timeout(self, timeout: Duration) -> Self {
        self.set_writer_timeout(Some(timeout));
        self
    }

    /// Marks the store read-only and returns the config for chaining.
    pub fn with_read_only(self, read_only: bool) -> Self {
        self.set_read_only(read_only);
        self
    }

    #[inline]
    pub fn writer_timeout(&self) -> Option<Duration> {
        self.inner.writer_timeout.get()
    }

    #[inline]
    pub fn set_writer_timeout(&self, timeout: Option<Duration>) {
        self.inner.writer_timeout.set(timeout)
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::Relaxed)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::new()
    }
}

struct StoreConfigInner {
    writer_timeout: Shared<Option<Duration>>,
    read_only: AtomicBool,
}

impl StoreConfigInner {
    fn new() -> StoreConfigInner {
        StoreConfigInner {
            writer_timeout: Shared::new(None),
            read_only: AtomicBool::new(false),
        }
    }
}
