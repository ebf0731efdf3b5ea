//! Storage backends and abstractions.
//!
//! The store layer is a flat namespace of named buckets, each holding
//! byte-string keys mapped to byte-string values. Backends implement
//! [`StoreProvider`] and are wrapped in a [`Store`] handle, which hands out
//! transactions.
//!
//! # Storage Providers
//!
//! - **In-Memory Store**: [`memory::InMemoryStore`] for tests and scratch data
//! - **Fjall Store**: `bucketup_fjall_adapter` for persistent, LSM-based storage
//!
//! # Commit Model
//!
//! Transactions buffer their writes in a [`ChangeSet`]. On commit the whole
//! change set is handed to the provider, which applies it atomically.

mod changes;
pub mod memory;
mod store;
mod store_config;
pub(crate) mod writer_gate;

pub use changes::*;
pub use store::*;
pub use store_config::*;
