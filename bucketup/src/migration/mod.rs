//! Versioned schema migrations.
//!
//! The schema version of a store lives in the `migrations` bucket under the
//! key `version`, as an 8-byte big-endian integer. [`up`] compares it with the
//! number of migrations it is given and applies the missing ones in a single
//! write transaction:
//!
//! 1. read the stored version (0 if none)
//! 2. fail if the store is ahead of the migration list
//! 3. run every pending migration in order
//! 4. write the new version and commit
//!
//! Any failure rolls the transaction back, so a store never ends up with half
//! a batch applied or with a version that does not match its contents.

mod migration;
mod runner;
mod version;

pub use migration::*;
pub use runner::*;
pub use version::*;
