//! Transactions over a bucket store.
//!
//! A [`Transaction`] buffers its writes and applies them atomically on
//! commit. [`Bucket`] and [`Cursor`] are views borrowed from a transaction.
//! [`LimitedTx`] exposes the bucket operations of a transaction without its
//! lifecycle methods.

mod bucket;
mod cursor;
mod limited;
mod transaction;

pub use bucket::*;
pub use cursor::*;
pub use limited::*;
pub use transaction::*;
