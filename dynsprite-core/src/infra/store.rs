//! Durable byte storage for downloaded sprites.
//!
//! [`CacacheStore`] is a thin typed facade over `cacache` (index +
//! content-addressed, integrity-checked blobs). [`MemoryStore`] keeps bytes
//! for the lifetime of the process and backs tests and targets without a
//! writable disk.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Result, SpriteError};

/// Key→bytes persistence consulted before the network.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// `Ok(None)` when nothing was persisted for `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Stable key for locating a sprite blob within the store.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SpriteStoreKey(String);

impl SpriteStoreKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SpriteStoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpriteStoreKey").field(&self.0).finish()
    }
}

impl fmt::Display for SpriteStoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the store key for a resource key.
///
/// Versioned so a change in what gets persisted (raw download vs re-encoded
/// pixels) can never read back blobs written under the old layout.
pub fn sprite_store_key_for(resource_key: &str) -> SpriteStoreKey {
    let mut key = String::with_capacity(11 + resource_key.len());
    key.push_str("sprites/v1/");
    key.push_str(resource_key);
    SpriteStoreKey(key)
}

#[derive(Clone, Debug)]
pub struct CacacheStore {
    root: PathBuf,
}

impl CacacheStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = sprite_store_key_for(key);
        cacache::index::RemoveOpts::new()
            .remove_fully(true)
            .remove(&self.root, key.as_str())
            .await
            .map_err(|e| SpriteError::persist(key.as_str(), e))
    }
}

#[async_trait]
impl DurableStore for CacacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = sprite_store_key_for(key);
        match cacache::read(&self.root, key.as_str()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(cacache::Error::IntegrityError(err)) => {
                Err(SpriteError::Internal(format!(
                    "cache entry failed integrity check: {key} ({err})"
                )))
            }
            Err(cacache::Error::SizeMismatch(wanted, actual)) => {
                Err(SpriteError::Internal(format!(
                    "cache entry size mismatch: key={key}, wanted={wanted}, actual={actual}"
                )))
            }
            Err(e) => Err(SpriteError::Internal(format!(
                "cacache read failed: {key} ({e})"
            ))),
        }
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let key = sprite_store_key_for(key);
        cacache::write(&self.root, key.as_str(), bytes)
            .await
            .map(|_integrity| ())
            .map_err(|e| SpriteError::persist(key.as_str(), e))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<SpriteStoreKey, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .get(&sprite_store_key_for(key))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.insert(sprite_store_key_for(key), bytes.to_vec());
        Ok(())
    }
}
