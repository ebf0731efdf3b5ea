use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use crate::transaction::Transaction;

/// A key and, for bucket entries, its value. Entries of a top-level cursor
/// are bucket names and carry no value.
pub type CursorEntry = (Vec<u8>, Option<Vec<u8>>);

/// Ordered, positioned view over a bucket or over the top-level bucket names.
///
/// A cursor works on a snapshot taken when it was opened. Writes made through
/// the transaction afterwards are not reflected, except for deletes made with
/// [`Cursor::delete`] itself.
pub struct Cursor<'tx> {
    tx: &'tx Transaction,
    bucket: Option<Vec<u8>>,
    entries: Vec<CursorEntry>,
    position: Option<usize>,
    // the entry under the cursor was deleted; `position` now points at its successor
    detached: bool,
}

impl<'tx> Cursor<'tx> {
    pub(crate) fn new(
        tx: &'tx Transaction,
        bucket: Option<Vec<u8>>,
        entries: Vec<CursorEntry>,
    ) -> Self {
        Cursor {
            tx,
            bucket,
            entries,
            position: None,
            detached: false,
        }
    }

    /// Name of the bucket this cursor walks, `None` for a top-level cursor.
    pub fn bucket(&self) -> Option<&[u8]> {
        self.bucket.as_deref()
    }

    pub fn first(&mut self) -> Option<CursorEntry> {
        self.move_to(0)
    }

    pub fn last(&mut self) -> Option<CursorEntry> {
        match self.entries.len() {
            0 => self.move_to(0),
            len => self.move_to(len - 1),
        }
    }

    pub fn next(&mut self) -> Option<CursorEntry> {
        let position = self.position?;
        if self.detached {
            return self.move_to(position);
        }
        self.move_to(position + 1)
    }

    pub fn prev(&mut self) -> Option<CursorEntry> {
        let position = self.position?;
        match position.checked_sub(1) {
            Some(previous) => self.move_to(previous),
            None => {
                self.position = None;
                self.detached = false;
                None
            }
        }
    }

    /// Moves to the first entry whose key is greater than or equal to `key`.
    pub fn seek(&mut self, key: &[u8]) -> Option<CursorEntry> {
        let index = self
            .entries
            .partition_point(|(entry_key, _)| entry_key.as_slice() < key);
        self.move_to(index)
    }

    /// Deletes the entry under the cursor. A following `next` returns the
    /// entry after the deleted one.
    ///
    /// # Errors
    /// * `IncompatibleValue` on a top-level cursor, whose entries are buckets
    /// * `InvalidOperation` when the cursor is not positioned on an entry
    pub fn delete(&mut self) -> BucketupResult<()> {
        let bucket = match &self.bucket {
            Some(bucket) => bucket,
            None => {
                return Err(BucketupError::new(
                    "Cannot delete a bucket through a cursor, use delete_bucket",
                    ErrorKind::IncompatibleValue,
                ))
            }
        };

        let position = match self.position {
            Some(position) if !self.detached => position,
            _ => {
                return Err(BucketupError::new(
                    "Cursor is not positioned on an entry",
                    ErrorKind::InvalidOperation,
                ))
            }
        };

        self.tx.delete_value(bucket, &self.entries[position].0)?;
        self.entries.remove(position);
        self.detached = true;
        Ok(())
    }

    fn move_to(&mut self, index: usize) -> Option<CursorEntry> {
        self.detached = false;
        match self.entries.get(index) {
            Some(entry) => {
                self.position = Some(index);
                Some(entry.clone())
            }
            None => {
                self.position = None;
                None
            }
        }
    }
}
