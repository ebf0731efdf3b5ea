use parking_lot::RwLock;
use std::sync::Arc;

/// A setting slot shared by every clone of the handle that owns it.
///
/// Configuration handles are cheap to clone and all clones must observe the
/// same values; values that do not fit in a std atomic live in a `Shared`.
pub struct Shared<T> {
    slot: Arc<RwLock<T>>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Shared<T> {
        Shared {
            slot: Arc::new(RwLock::new(value)),
        }
    }

    #[inline]
    pub fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.read())
    }

    #[inline]
    pub fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.slot.write())
    }

    #[inline]
    pub fn set(&self, value: T) {
        *self.slot.write() = value;
    }
}

impl<T: Clone> Shared<T> {
    #[inline]
    pub fn get(&self) -> T {
        self.slot.read().clone()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared {
            slot: Arc::clone(&self.slot),
        }
    }
}
