use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Single-writer gate of a store.
///
/// At most one [`WriterPermit`] exists at a time. Dropping the permit wakes
/// the next waiting writer.
#[derive(Clone)]
pub(crate) struct WriterGate {
    inner: Arc<WriterGateInner>,
}

struct WriterGateInner {
    held: Mutex<bool>,
    released: Condvar,
}

impl WriterGate {
    pub(crate) fn new() -> Self {
        WriterGate {
            inner: Arc::new(WriterGateInner {
                held: Mutex::new(false),
                released: Condvar::new(),
            }),
        }
    }

    /// Blocks until the gate is free, or until `timeout` elapses.
    pub(crate) fn acquire(&self, timeout: Option<Duration>) -> BucketupResult<WriterPermit> {
        let mut held = self.inner.held.lock();
        match timeout {
            None => {
                while *held {
                    self.inner.released.wait(&mut held);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *held {
                    if self.inner.released.wait_until(&mut held, deadline).timed_out() && *held {
                        return Err(BucketupError::new(
                            &format!("Timed out after {:?} waiting for the writer lock", timeout),
                            ErrorKind::WriterTimeout,
                        ));
                    }
                }
            }
        }
        *held = true;
        Ok(WriterPermit {
            gate: self.inner.clone(),
        })
    }

    pub(crate) fn is_held(&self) -> bool {
        *self.inner.held.lock()
    }
}

/// Proof of exclusive write access; released on drop.
pub(crate) struct WriterPermit {
    gate: Arc<WriterGateInner>,
}

impl Drop for WriterPermit {
    fn drop(&mut self) {
        let mut held = self.gate.held.lock();
        *held = false;
        self.gate.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_acquire_and_release() {
        let gate = WriterGate::new();
        assert!(!gate.is_held());

        let permit = gate.acquire(None).unwrap();
        assert!(gate.is_held());

        drop(permit);
        assert!(!gate.is_held());
    }

    #[test]
    fn test_second_writer_times_out() {
        let gate = WriterGate::new();
        let _permit = gate.acquire(None).unwrap();

        let err = gate
            .acquire(Some(Duration::from_millis(20)))
            .err()
            .expect("second writer should time out");
        assert_eq!(err.kind(), &ErrorKind::WriterTimeout);
    }

    #[test]
    fn test_waiting_writer_proceeds_after_release() {
        let gate = WriterGate::new();
        let permit = gate.acquire(None).unwrap();

        let waiter_gate = gate.clone();
        let waiter = thread::spawn(move || {
            let permit = waiter_gate.acquire(Some(Duration::from_secs(5)));
            permit.is_ok()
        });

        thread::sleep(Duration::from_millis(20));
        drop(permit);
        assert!(waiter.join().unwrap());
        assert!(!gate.is_held());
    }
}
