//! System keyring storage.
//!
//! Uses the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use super::Storage;
use crate::error::{Error, Result};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailgrant";

/// Stores each key as a keyring entry under one service name.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    /// Creates storage using the default service name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Creates storage under a custom service name.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> keyring::Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Entry::new(&service, &key).and_then(op))
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
            .map_err(keyring_error)
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn keyring_error(error: keyring::Error) -> Error {
    Error::StorageUnavailable(format!("keyring: {error}"))
}

#[async_trait]
impl Storage for KeyringStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_entry(key, |entry| match entry.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let value = value.to_vec();
        self.with_entry(key, move |entry| entry.set_secret(&value))
            .await?;
        debug!(key, "stored keyring entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let result = self
            .with_entry(key, |entry| match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e),
            })
            .await;
        if let Err(e) = &result {
            warn!(key, "failed to delete keyring entry: {e}");
        }
        result
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
