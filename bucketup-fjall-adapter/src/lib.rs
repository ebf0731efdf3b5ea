//! Persistent bucket storage for bucketup on top of the Fjall LSM-tree.
//!
//! ```rust,no_run
//! use bucketup::migration::up;
//! use bucketup_fjall_adapter::FjallStore;
//!
//! # fn main() -> bucketup::errors::BucketupResult<()> {
//! let store = FjallStore::with_config()
//!     .low_memory_preset()
//!     .db_path("/path/to/db")
//!     .build()?;
//! up(&store, &[])?;
//! store.close()
//! # }
//! ```

mod builder;
mod config;
mod keys;
mod store;
mod version;
mod wrapper;

pub use builder::*;
pub use config::*;
pub use keys::FjallKeyError;
pub use store::*;
