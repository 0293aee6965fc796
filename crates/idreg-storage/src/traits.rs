//! Storage trait definitions.

use crate::errors::{Result, StorageError};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Storage interface for key-value operations
///
/// This trait abstracts the underlying storage implementation (RocksDB)
/// so the registry core can be handed an explicit store capability.
/// Reads are direct; every write goes through a [`Batch`] so that it is
/// checked against the batch's preconditions under the commit lock.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family
    ///
    /// # Returns
    ///
    /// `Ok(Some(value))` if key exists, `Ok(None)` if not found
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Get multiple values by prefix (range query)
    ///
    /// Returns all key-value pairs where keys start with the given prefix.
    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Look up several pre-serialized keys from one consistent view
    ///
    /// Results are returned in the order of `keys`. Use [`encode_key`] to
    /// build the keys and [`decode_value`] to read the results.
    async fn multi_get_raw(&self, keys: Vec<(&str, Vec<u8>)>) -> Result<Vec<Option<Vec<u8>>>>;

    /// Create a new batch for atomic operations
    fn batch(&self) -> Box<dyn Batch>;

    /// Begin a transaction (for multi-CF atomic operations)
    async fn begin_transaction(&self) -> Result<Box<dyn Batch>>;
}

/// Batch interface for atomic operations
///
/// Batches allow multiple operations to be performed atomically. A batch may
/// also carry preconditions: each one names a key and the exact bytes it must
/// hold (or that it must be absent) when the batch commits. If any
/// precondition fails, nothing is written and commit returns
/// [`StorageError::Conflict`].
///
/// Note: This trait works with pre-serialized bytes to maintain object safety.
/// Use the [`BatchExt`] helpers for typed keys and values.
///
/// Batches only need to be `Send` (not `Sync`) since they are used within a single
/// task context and not shared across threads.
#[async_trait]
pub trait Batch: Send {
    /// Put a pre-serialized key-value pair in the batch
    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Delete a pre-serialized key in the batch
    fn delete_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()>;

    /// Require `key` to hold `expected` at commit time (`None` = absent)
    fn expect_raw(&mut self, cf: &str, key: Vec<u8>, expected: Option<Vec<u8>>) -> Result<()>;

    /// Commit the batch atomically
    ///
    /// Dropping a batch without committing discards it.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Extension trait providing type-safe methods for Batch
pub trait BatchExt: Batch {
    /// Put a key-value pair in the batch (type-safe)
    fn put<K, V>(&mut self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key_bytes = encode_key(key)?;
        let value_bytes = encode_value(value)?;
        self.put_raw(cf, key_bytes, value_bytes)
    }

    /// Delete a key in the batch (type-safe)
    fn delete<K>(&mut self, cf: &str, key: &K) -> Result<()>
    where
        K: Serialize,
    {
        let key_bytes = encode_key(key)?;
        self.delete_raw(cf, key_bytes)
    }

    /// Require `key` to be absent at commit time
    fn expect_absent<K>(&mut self, cf: &str, key: &K) -> Result<()>
    where
        K: Serialize,
    {
        let key_bytes = encode_key(key)?;
        self.expect_raw(cf, key_bytes, None)
    }

    /// Require `key` to still hold `value` (or be absent, for `None`) at commit time
    fn expect_unchanged<K, V>(&mut self, cf: &str, key: &K, value: Option<&V>) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key_bytes = encode_key(key)?;
        let expected = value.map(encode_value).transpose()?;
        self.expect_raw(cf, key_bytes, expected)
    }
}

/// Automatically implement BatchExt for all types that implement Batch
impl<T: Batch + ?Sized> BatchExt for T {}

/// Serialize a key
pub fn encode_key<K: Serialize + ?Sized>(key: &K) -> Result<Vec<u8>> {
    bincode::serialize(key).map_err(StorageError::Encode)
}

/// Serialize a value
pub fn encode_value<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(StorageError::Encode)
}

/// Deserialize a value
pub fn decode_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    bincode::deserialize(bytes).map_err(StorageError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_key_starts_with_first_component() {
        let prefix = encode_key("alice").unwrap();
        let key = encode_key(&("alice".to_string(), "npub1".to_string())).unwrap();
        assert!(key.starts_with(&prefix));
    }

    #[test]
    fn test_length_prefix_keeps_names_apart() {
        let prefix = encode_key("ali").unwrap();
        let key = encode_key(&("alice".to_string(), "npub1".to_string())).unwrap();
        assert!(!key.starts_with(&prefix));
    }
}
