//! Token persistence.
//!
//! [`TokenStore`] serializes [`TokenRecord`]s to JSON and keeps one entry per
//! identity in a [`Storage`] backend. Backends only move bytes; they are
//! expected to replace a value atomically so a concurrent reader never sees a
//! partial write.

mod file;
#[cfg(feature = "keyring")]
mod keyring;
mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub use file::FileStorage;
#[cfg(feature = "keyring")]
pub use self::keyring::KeyringStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::{Error, Result};
use crate::record::{IdentityKey, TokenRecord};

/// Durable key-value storage capability.
///
/// All failures are reported as [`Error::StorageUnavailable`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Returns true if a value is stored under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Persists one [`TokenRecord`] per identity.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    prefix: String,
}

impl TokenStore {
    /// Creates a token store over `storage`, namespacing keys with `prefix`.
    pub fn new(storage: Arc<dyn Storage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    /// Storage key for an identity.
    #[must_use]
    pub fn key_for(&self, identity: &IdentityKey) -> String {
        format!("{}{identity}.json", self.prefix)
    }

    /// Loads the record for `identity`.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored value is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageCorrupt`] if the stored bytes do not decode,
    /// or [`Error::StorageUnavailable`] on backend failure.
    pub async fn load(&self, identity: &IdentityKey) -> Result<Option<TokenRecord>> {
        let key = self.key_for(identity);
        let Some(bytes) = self.storage.get(&key).await? else {
            debug!(%identity, "no stored token");
            return Ok(None);
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!(%identity, "stored token is empty");
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::StorageCorrupt {
                key,
                reason: e.to_string(),
            })
    }

    /// Saves `record` for `identity`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] on backend failure.
    pub async fn save(&self, identity: &IdentityKey, record: &TokenRecord) -> Result<()> {
        let key = self.key_for(identity);
        let bytes = serde_json::to_vec(record).map_err(|e| Error::StorageCorrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&key, &bytes).await?;
        debug!(%identity, "saved token");
        Ok(())
    }

    /// Removes the record for `identity`. Succeeds if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] on backend failure.
    pub async fn clear(&self, identity: &IdentityKey) -> Result<()> {
        self.storage.delete(&self.key_for(identity)).await?;
        debug!(%identity, "cleared stored token");
        Ok(())
    }

    /// Returns true if a record is stored for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] on backend failure.
    pub async fn contains(&self, identity: &IdentityKey) -> Result<bool> {
        self.storage.exists(&self.key_for(identity)).await
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
