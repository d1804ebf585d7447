//! The pluggable keyed blob-store the keychain facade persists to.
//!
//! The facade owns no storage logic of its own — it only ever talks to a
//! [`Datastore`] trait object. This mirrors the split between
//! `privstack-vault` (policy) and `privstack-blobstore` (storage) in the
//! wider workspace: here the storage side is reduced to a trait plus an
//! in-memory reference implementation, since the real backend is an
//! external collaborator the facade should stay agnostic to.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type DatastoreResult<T> = Result<T, DatastoreError>;

/// A single put/delete staged inside a [`Batch`].
enum Op {
    Put(String, Vec<u8>),
    Delete(String),
}

/// A set of put/delete operations applied together.
///
/// Whether `commit` is atomic depends on the implementation; callers that
/// need the rename-is-atomic guarantee from the facade's contract must use
/// a backend whose batch commit is itself atomic (e.g. a single DB
/// transaction). [`InMemoryDatastore`]'s batch is atomic because commit
/// takes a single write lock for the whole operation list.
#[async_trait]
pub trait Batch: Send {
    fn put(&mut self, key: String, value: Vec<u8>);
    fn delete(&mut self, key: String);
    async fn commit(self: Box<Self>) -> DatastoreResult<()>;
}

/// Keyed blob-store contract. Keys are opaque UTF-8 strings produced by the
/// facade's name policy (`/<name>`); values are opaque bytes (PKCS#8
/// encrypted PEM, in this crate's only caller).
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn has(&self, key: &str) -> DatastoreResult<bool>;
    async fn get(&self, key: &str) -> DatastoreResult<Vec<u8>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> DatastoreResult<()>;
    async fn delete(&self, key: &str) -> DatastoreResult<()>;
    /// Keys-only enumeration. No ordering is promised.
    async fn query_keys(&self) -> DatastoreResult<Vec<String>>;
    fn batch(&self) -> Box<dyn Batch>;
}

/// In-memory reference [`Datastore`], used by the facade's own test suite
/// and by callers who haven't wired a persistent backend yet.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn has(&self, key: &str) -> DatastoreResult<bool> {
        Ok(self.data.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> DatastoreResult<Vec<u8>> {
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| DatastoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> DatastoreResult<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> DatastoreResult<()> {
        self.data
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| DatastoreError::NotFound(key.to_string()))
    }

    async fn query_keys(&self) -> DatastoreResult<Vec<String>> {
        Ok(self.data.read().await.keys().cloned().collect())
    }

    fn batch(&self) -> Box<dyn Batch> {
        Box::new(InMemoryBatch {
            store: self.data.clone(),
            ops: Vec::new(),
        })
    }
}

struct InMemoryBatch {
    store: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    ops: Vec<Op>,
}

#[async_trait]
impl Batch for InMemoryBatch {
    fn put(&mut self, key: String, value: Vec<u8>) {
        self.ops.push(Op::Put(key, value));
    }

    fn delete(&mut self, key: String) {
        self.ops.push(Op::Delete(key));
    }

    async fn commit(self: Box<Self>) -> DatastoreResult<()> {
        let mut guard = self.store.write().await;
        for op in self.ops {
            match op {
                Op::Put(k, v) => {
                    guard.insert(k, v);
                }
                Op::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let ds = InMemoryDatastore::new();
        ds.put("/alice", b"pem-blob".to_vec()).await.unwrap();
        assert!(ds.has("/alice").await.unwrap());
        assert_eq!(ds.get("/alice").await.unwrap(), b"pem-blob");
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let ds = InMemoryDatastore::new();
        assert!(matches!(
            ds.get("/nope").await,
            Err(DatastoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_missing_key_is_not_found() {
        let ds = InMemoryDatastore::new();
        assert!(matches!(
            ds.delete("/nope").await,
            Err(DatastoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn batch_put_and_delete_apply_together() {
        let ds = InMemoryDatastore::new();
        ds.put("/old-name", b"pem".to_vec()).await.unwrap();

        let mut batch = ds.batch();
        batch.put("/new-name".to_string(), b"pem".to_vec());
        batch.delete("/old-name".to_string());
        batch.commit().await.unwrap();

        assert!(!ds.has("/old-name").await.unwrap());
        assert!(ds.has("/new-name").await.unwrap());
    }

    #[tokio::test]
    async fn query_keys_lists_everything_without_values() {
        let ds = InMemoryDatastore::new();
        ds.put("/a", b"1".to_vec()).await.unwrap();
        ds.put("/b", b"2".to_vec()).await.unwrap();
        let mut keys = ds.query_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["/a".to_string(), "/b".to_string()]);
    }
}
