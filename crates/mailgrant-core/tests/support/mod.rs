//! Test doubles for the provider and profile boundaries.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mailgrant_core::{
    Error, MemoryStorage, OAuthClientAdapter, Profile, ProfileFetcher, Result, Storage,
    TokenRecord,
};

/// Scripted provider that honours one-time codes and counts round-trips.
#[derive(Default)]
pub struct MockProvider {
    codes: Mutex<HashMap<String, TokenRecord>>,
    refresh_response: Mutex<Option<TokenRecord>>,
    revoke_fails: Mutex<bool>,
    outages: AtomicUsize,
    revoked: Mutex<Vec<TokenRecord>>,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a code that can be exchanged once for `record`.
    pub fn with_code(self, code: &str, record: TokenRecord) -> Self {
        self.codes.lock().unwrap().insert(code.to_string(), record);
        self
    }

    /// Makes refresh succeed with `record`; refresh is rejected otherwise.
    pub fn refreshing_to(self, record: TokenRecord) -> Self {
        *self.refresh_response.lock().unwrap() = Some(record);
        self
    }

    /// Makes the next `attempts` refresh calls fail as if the provider were down.
    pub fn unavailable_for(self, attempts: usize) -> Self {
        self.outages.store(attempts, Ordering::SeqCst);
        self
    }

    pub fn failing_revoke(self) -> Self {
        *self.revoke_fails.lock().unwrap() = true;
        self
    }

    pub fn revoked(&self) -> Vec<TokenRecord> {
        self.revoked.lock().unwrap().clone()
    }

    pub fn network_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
            + self.refresh_calls.load(Ordering::SeqCst)
            + self.revoke_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClientAdapter for MockProvider {
    async fn exchange_code(&self, code: &str) -> Result<TokenRecord> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.codes
            .lock()
            .unwrap()
            .remove(code)
            .ok_or_else(|| Error::AuthenticationFailed("invalid_grant".into()))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenRecord> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::ProviderUnavailable("HTTP 503: upstream unavailable".into()));
        }
        self.refresh_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::RefreshFailed("invalid_grant".into()))
    }

    async fn revoke(&self, record: &TokenRecord) -> Result<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if *self.revoke_fails.lock().unwrap() {
            return Err(Error::Revoke("connection reset".into()));
        }
        self.revoked.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Profile lookup returning a fixed address, or failing when none is set.
pub struct MockProfile(pub Option<String>);

#[async_trait]
impl ProfileFetcher for MockProfile {
    async fn get_profile(&self, _access_token: &str) -> Result<Profile> {
        let email_address = self
            .0
            .clone()
            .ok_or_else(|| Error::Profile("HTTP 503 Service Unavailable".into()))?;
        Ok(Profile {
            email_address,
            messages_total: None,
            threads_total: None,
            history_id: None,
        })
    }
}

/// Backend whose every call fails.
pub struct BrokenStorage;

#[async_trait]
impl Storage for BrokenStorage {
    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::StorageUnavailable("disk on fire".into()))
    }
    async fn put(&self, _: &str, _: &[u8]) -> Result<()> {
        Err(Error::StorageUnavailable("disk on fire".into()))
    }
    async fn delete(&self, _: &str) -> Result<()> {
        Err(Error::StorageUnavailable("disk on fire".into()))
    }
    async fn exists(&self, _: &str) -> Result<bool> {
        Err(Error::StorageUnavailable("disk on fire".into()))
    }
}

pub fn fresh(access: &str) -> TokenRecord {
    TokenRecord::new(access, Utc::now() + Duration::hours(1))
}

pub fn stale(access: &str) -> TokenRecord {
    TokenRecord::new(access, Utc::now() - Duration::hours(1))
}

/// Backend that can be read but refuses every write.
pub struct ReadOnlyStorage(pub Arc<MemoryStorage>);

#[async_trait]
impl Storage for ReadOnlyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.0.get(key).await
    }
    async fn put(&self, _: &str, _: &[u8]) -> Result<()> {
        Err(Error::StorageUnavailable("read-only file system".into()))
    }
    async fn delete(&self, _: &str) -> Result<()> {
        Err(Error::StorageUnavailable("read-only file system".into()))
    }
    async fn exists(&self, key: &str) -> Result<bool> {
        self.0.exists(key).await
    }
}
