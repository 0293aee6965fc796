//! # idreg-storage
//!
//! Storage abstraction layer for the identity registry using RocksDB.
//!
//! The registry core only sees the [`Storage`] and [`Batch`] traits. Batches
//! carry commit-time preconditions, which is how the core gets a uniqueness
//! constraint on identity names and atomic multi-row mutations out of a
//! key-value store.

#![warn(clippy::all)]

pub mod column_families;
pub mod errors;
pub mod rocksdb_impl;
pub mod traits;

pub use column_families::*;
pub use errors::{Result, StorageError};
pub use rocksdb_impl::RocksDbStorage;
pub use traits::{decode_value, encode_key, encode_value, Batch, BatchExt, Storage};
