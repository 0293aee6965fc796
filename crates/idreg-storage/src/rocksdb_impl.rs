//! RocksDB storage implementation.

use crate::{
    column_families::all_column_families,
    errors::{Result, StorageError},
    traits::{decode_value, encode_key, Batch, Storage},
};
use async_trait::async_trait;
use rocksdb::{Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tempfile::TempDir;
use tracing::debug;

/// RocksDB storage implementation
///
/// Guarded batches serialize their check-and-write through `commit_lock`.
/// Writes that must observe preconditions go through a batch.
pub struct RocksDbStorage {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
    _temp_dir: Option<TempDir>,
}

impl RocksDbStorage {
    /// Open RocksDB database at the specified path
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, &path, all_column_families())?;

        debug!("Opened RocksDB at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
            _temp_dir: None,
        })
    }

    /// Open RocksDB database in a temporary directory
    ///
    /// The directory lives as long as the returned storage. This is public for
    /// use in other crates' test modules.
    pub fn open_test() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut storage = Self::open(temp_dir.path())?;
        storage._temp_dir = Some(temp_dir);
        Ok(storage)
    }

    /// Get column family handle
    fn cf_handle(&self, cf: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(cf)
            .ok_or_else(|| StorageError::UnknownColumnFamily(cf.to_string()))
    }
}

#[async_trait]
impl Storage for RocksDbStorage {
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = encode_key(key)?;

        match self.db.get_cf(cf_handle, &key_bytes)? {
            Some(bytes) => {
                let value = decode_value(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned,
    {
        let cf_handle = self.cf_handle(cf)?;
        let prefix_bytes = encode_key(prefix)?;

        let mut results = Vec::new();

        // Seek to the prefix; works without a prefix extractor configured
        let iter = self.db.iterator_cf(
            cf_handle,
            rocksdb::IteratorMode::From(&prefix_bytes, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, value) = item?;

            if !key.starts_with(&prefix_bytes) {
                // Keys are sorted, so once we're past the prefix, we're done
                break;
            }
            results.push((key.to_vec(), decode_value(&value)?));
        }

        Ok(results)
    }

    async fn multi_get_raw(&self, keys: Vec<(&str, Vec<u8>)>) -> Result<Vec<Option<Vec<u8>>>> {
        let mut lookups = Vec::with_capacity(keys.len());
        for (cf, key) in keys {
            lookups.push((self.cf_handle(cf)?, key));
        }

        self.db
            .multi_get_cf(lookups)
            .into_iter()
            .map(|r| r.map_err(StorageError::from))
            .collect()
    }

    fn batch(&self) -> Box<dyn Batch> {
        Box::new(RocksDbBatch {
            db: Arc::clone(&self.db),
            commit_lock: Arc::clone(&self.commit_lock),
            write_batch: WriteBatch::default(),
            expectations: Vec::new(),
        })
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Batch>> {
        // For RocksDB, transactions are guarded batches
        Ok(self.batch())
    }
}

struct Expectation {
    cf: String,
    key: Vec<u8>,
    value: Option<Vec<u8>>,
}

/// RocksDB batch implementation
pub struct RocksDbBatch {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
    write_batch: WriteBatch,
    expectations: Vec<Expectation>,
}

impl RocksDbBatch {
    fn cf_handle(&self, cf: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(cf)
            .ok_or_else(|| StorageError::UnknownColumnFamily(cf.to_string()))
    }

    fn commit_guarded(self) -> Result<()> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StorageError::CommitLockPoisoned)?;

        for expectation in &self.expectations {
            let cf_handle = self.cf_handle(&expectation.cf)?;
            let current = self.db.get_cf(cf_handle, &expectation.key)?;

            if current != expectation.value {
                debug!(cf = %expectation.cf, "Batch precondition failed");
                return Err(StorageError::Conflict {
                    cf: expectation.cf.clone(),
                });
            }
        }

        self.db.write(self.write_batch)?;
        Ok(())
    }
}

#[async_trait]
impl Batch for RocksDbBatch {
    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let cf_handle = self
            .db
            .cf_handle(cf)
            .ok_or_else(|| StorageError::UnknownColumnFamily(cf.to_string()))?;
        self.write_batch.put_cf(cf_handle, &key, &value);
        Ok(())
    }

    fn delete_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()> {
        let cf_handle = self
            .db
            .cf_handle(cf)
            .ok_or_else(|| StorageError::UnknownColumnFamily(cf.to_string()))?;
        self.write_batch.delete_cf(cf_handle, &key);
        Ok(())
    }

    fn expect_raw(&mut self, cf: &str, key: Vec<u8>, expected: Option<Vec<u8>>) -> Result<()> {
        self.cf_handle(cf)?;
        self.expectations.push(Expectation {
            cf: cf.to_string(),
            key,
            value: expected,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let preconditions = self.expectations.len();
        (*self).commit_guarded()?;

        debug!(preconditions, "Batch committed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{column_families::*, traits::BatchExt};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: u64,
    }

    fn data(name: &str, value: u64) -> TestData {
        TestData {
            name: name.to_string(),
            value,
        }
    }

    async fn seed<K: Serialize>(storage: &RocksDbStorage, cf: &str, key: &K, value: &TestData) {
        let mut batch = storage.batch();
        batch.put(cf, key, value).unwrap();
        batch.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let storage = RocksDbStorage::open_test().unwrap();

        let result: Option<TestData> = storage
            .get(CF_IDENTITIES, &"nobody".to_string())
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_unknown_column_family() {
        let storage = RocksDbStorage::open_test().unwrap();

        let err = storage
            .get::<_, TestData>("sessions", &"alice".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownColumnFamily(cf) if cf == "sessions"));
        assert!(storage.batch().expect_absent("sessions", &"alice").is_err());
    }

    #[tokio::test]
    async fn test_decode_error_on_type_mismatch() {
        let storage = RocksDbStorage::open_test().unwrap();
        let mut batch = storage.batch();
        batch.put(CF_USERS, &"s1".to_string(), &7u8).unwrap();
        batch.commit().await.unwrap();

        let err = storage
            .get::<_, TestData>(CF_USERS, &"s1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Decode(_)));
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn test_batch_commit() {
        let storage = RocksDbStorage::open_test().unwrap();

        let mut batch = storage.batch();
        batch.put(CF_IDENTITIES, &"a".to_string(), &data("a", 1)).unwrap();
        batch.put(CF_USERS, &"s1".to_string(), &data("s1", 2)).unwrap();
        batch.commit().await.unwrap();

        let a: Option<TestData> = storage.get(CF_IDENTITIES, &"a".to_string()).await.unwrap();
        let s1: Option<TestData> = storage.get(CF_USERS, &"s1".to_string()).await.unwrap();
        assert_eq!(a, Some(data("a", 1)));
        assert_eq!(s1, Some(data("s1", 2)));
    }

    #[tokio::test]
    async fn test_dropped_batch_writes_nothing() {
        let storage = RocksDbStorage::open_test().unwrap();
        let key = "alice".to_string();

        let mut batch = storage.batch();
        batch.put(CF_IDENTITIES, &key, &data("alice", 42)).unwrap();
        drop(batch);

        let result: Option<TestData> = storage.get(CF_IDENTITIES, &key).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_batch_delete() {
        let storage = RocksDbStorage::open_test().unwrap();
        let key = "alice".to_string();
        seed(&storage, CF_IDENTITIES, &key, &data("alice", 1)).await;

        let mut batch = storage.batch();
        batch.delete(CF_IDENTITIES, &key).unwrap();
        batch.commit().await.unwrap();

        let result: Option<TestData> = storage.get(CF_IDENTITIES, &key).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_expect_absent_rejects_second_insert() {
        let storage = RocksDbStorage::open_test().unwrap();
        let key = "alice".to_string();

        let mut first = storage.batch();
        first.expect_absent(CF_IDENTITIES, &key).unwrap();
        first.put(CF_IDENTITIES, &key, &data("first", 1)).unwrap();

        let mut second = storage.batch();
        second.expect_absent(CF_IDENTITIES, &key).unwrap();
        second.put(CF_IDENTITIES, &key, &data("second", 2)).unwrap();
        second.put(CF_USERS, &"s2".to_string(), &data("s2", 2)).unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(err.is_conflict());

        // Nothing from the losing batch was written
        let stored: Option<TestData> = storage.get(CF_IDENTITIES, &key).await.unwrap();
        assert_eq!(stored, Some(data("first", 1)));
        let user: Option<TestData> = storage.get(CF_USERS, &"s2".to_string()).await.unwrap();
        assert_eq!(user, None);
    }

    #[tokio::test]
    async fn test_expect_unchanged_detects_concurrent_update() {
        let storage = RocksDbStorage::open_test().unwrap();
        let key = "alice".to_string();
        let original = data("alice", 1);
        seed(&storage, CF_IDENTITIES, &key, &original).await;

        let mut stale = storage.batch();
        stale
            .expect_unchanged(CF_IDENTITIES, &key, Some(&original))
            .unwrap();
        stale.put(CF_IDENTITIES, &key, &data("alice", 2)).unwrap();

        let mut fresh = storage.batch();
        fresh
            .expect_unchanged(CF_IDENTITIES, &key, Some(&original))
            .unwrap();
        fresh.put(CF_IDENTITIES, &key, &data("alice", 3)).unwrap();

        fresh.commit().await.unwrap();
        assert!(stale.commit().await.unwrap_err().is_conflict());

        let stored: Option<TestData> = storage.get(CF_IDENTITIES, &key).await.unwrap();
        assert_eq!(stored, Some(data("alice", 3)));
    }

    #[tokio::test]
    async fn test_multi_get_raw_preserves_order() {
        let storage = RocksDbStorage::open_test().unwrap();
        seed(&storage, CF_IDENTITIES, &"alice".to_string(), &data("alice", 1)).await;
        seed(&storage, CF_USERS, &"s1".to_string(), &data("s1", 7)).await;

        let results = storage
            .multi_get_raw(vec![
                (CF_USERS, encode_key("s1").unwrap()),
                (CF_IDENTITIES, encode_key("missing").unwrap()),
                (CF_IDENTITIES, encode_key("alice").unwrap()),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let user: TestData = decode_value(results[0].as_deref().unwrap()).unwrap();
        assert_eq!(user, data("s1", 7));
        assert!(results[1].is_none());
        let identity: TestData = decode_value(results[2].as_deref().unwrap()).unwrap();
        assert_eq!(identity, data("alice", 1));
    }

    #[tokio::test]
    async fn test_get_by_prefix() {
        let storage = RocksDbStorage::open_test().unwrap();

        for (name, sender) in [("alice", "s1"), ("alice", "s2"), ("alicia", "s3")] {
            let key = (name.to_string(), sender.to_string());
            seed(&storage, CF_MEMBERSHIPS, &key, &data(sender, 0)).await;
        }

        let results: Vec<(Vec<u8>, TestData)> = storage
            .get_by_prefix(CF_MEMBERSHIPS, &"alice".to_string())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }
}
