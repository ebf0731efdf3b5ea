//! # bucketup - Versioned Migrations for Bucket Stores
//!
//! bucketup applies an ordered list of migrations to an embedded,
//! transactional key-value store organised in named buckets. The store
//! remembers how many migrations it has seen; [`migration::up`] runs the ones
//! it has not, all inside a single write transaction.
//!
//! ## Key Features
//!
//! - **All or nothing**: pending migrations and the version update commit
//!   together or not at all
//! - **Restricted handle**: migrations get a [`transaction::LimitedTx`], which
//!   cannot commit or roll back the transaction it wraps
//! - **Pluggable storage**: an in-memory backend ships with this crate, a
//!   persistent one in `bucketup_fjall_adapter`
//!
//! ## Quick Start
//!
//! ```rust
//! use bucketup::migration::{current_version, up, Migration};
//! use bucketup::store::memory::InMemoryStore;
//! use bucketup::store::Store;
//! use bucketup::transaction::TxOperations;
//!
//! # fn main() -> bucketup::errors::BucketupResult<()> {
//! let store = Store::open(InMemoryStore::new())?;
//!
//! let migrations = vec![
//!     Migration::named("create settings", |tx| {
//!         tx.create_bucket(b"settings")?;
//!         Ok(())
//!     }),
//!     Migration::named("default theme", |tx| match tx.bucket(b"settings")? {
//!         Some(settings) => settings.put(b"theme", b"dark"),
//!         None => Ok(()),
//!     }),
//! ];
//!
//! up(&store, &migrations)?;
//! assert_eq!(current_version(&store)?, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Constants, limits and shared helpers
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - Migration runner and version bookkeeping
//! - [`store`] - Store handle, provider trait and the in-memory backend
//! - [`transaction`] - Transactions, buckets and cursors

pub mod common;
pub mod errors;
pub mod migration;
pub mod store;
pub mod transaction;
