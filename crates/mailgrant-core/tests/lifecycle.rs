//! Credential lifecycle tests.
//!
//! These drive [`CredentialManager`] through sign-in, refresh and logout
//! against a scripted provider, without touching the network.

#![allow(clippy::unwrap_used)]

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use mailgrant_core::{
    CredentialConfig, CredentialManager, CredentialState, Error, FileStorage, HttpOAuthAdapter,
    IdentityKey, LogoutOutcome, MemoryStorage, RevokeWarning, Storage, TokenStore,
};
use mailgrant_oauth::{OAuthClient, Provider};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{BrokenStorage, MockProfile, MockProvider, ReadOnlyStorage, fresh, stale};

fn config() -> CredentialConfig {
    CredentialConfig::new("client", "http://localhost:8080/oauth/callback")
}

fn token_store(storage: Arc<dyn Storage>) -> TokenStore {
    TokenStore::new(storage, "mailgrant-")
}

fn manager(provider: &Arc<MockProvider>, storage: Arc<dyn Storage>) -> CredentialManager {
    CredentialManager::new(config(), token_store(storage), provider.clone())
}

#[tokio::test]
async fn expired_token_is_refreshed_on_initialize_and_keeps_refresh_token() {
    let storage = Arc::new(MemoryStorage::new());
    let store = token_store(storage.clone());
    store
        .save(&IdentityKey::default(), &stale("A").with_refresh_token("R"))
        .await
        .unwrap();

    // The provider does not rotate the refresh token.
    let provider = Arc::new(MockProvider::new().refreshing_to(fresh("B")));
    let mut manager = manager(&provider, storage);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::Valid);

    let stored = store.load(&IdentityKey::default()).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "B");
    assert_eq!(stored.refresh_token(), Some("R"));
    assert!(stored.expires_at > Utc::now() + Duration::minutes(59));
    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ensure_valid_without_token_is_not_authenticated() {
    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, Arc::new(MemoryStorage::new()));

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::NoToken);
    assert!(matches!(
        manager.ensure_valid().await,
        Err(Error::NotAuthenticated)
    ));
    assert_eq!(provider.network_calls(), 0);
}

#[tokio::test]
async fn ensure_valid_initializes_lazily_and_refreshes() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), &stale("A").with_refresh_token("R"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new().refreshing_to(fresh("B")));
    let mut manager = manager(&provider, storage);
    assert_eq!(manager.state(), CredentialState::Uninitialized);

    let token = manager.ensure_valid().await.unwrap();
    assert_eq!(token.access_token, "B");
    assert_eq!(manager.state(), CredentialState::Valid);
}

#[tokio::test]
async fn valid_token_loads_without_network() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), &fresh("A"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::Valid);
    assert_eq!(manager.ensure_valid().await.unwrap().access_token, "A");
    assert!(!manager.is_expired().await.unwrap());
    assert_eq!(provider.network_calls(), 0);
}

#[tokio::test]
async fn authenticate_stores_under_profile_email() {
    let storage = Arc::new(MemoryStorage::new());
    let store = token_store(storage.clone());
    let provider = Arc::new(
        MockProvider::new().with_code("code-1", fresh("A").with_refresh_token("R")),
    );
    let mut manager = manager(&provider, storage)
        .with_profile_fetcher(Arc::new(MockProfile(Some("User@Gmail.com".into()))));
    manager.initialize().await.unwrap();

    let token = manager.authenticate("code-1").await.unwrap();
    assert_eq!(token.access_token, "A");
    assert_eq!(token.email.as_deref(), Some("User@Gmail.com"));

    assert_eq!(manager.state(), CredentialState::Valid);
    assert_eq!(manager.identity().as_str(), "user@gmail.com");
    assert_eq!(manager.email(), Some("User@Gmail.com"));

    let stored = store
        .load(&IdentityKey::new("user@gmail.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.refresh_token(), Some("R"));
    assert!(store.load(&IdentityKey::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn reused_code_is_rejected() {
    let provider = Arc::new(MockProvider::new().with_code("code-1", fresh("A")));
    let mut manager = manager(&provider, Arc::new(MemoryStorage::new()));
    manager.initialize().await.unwrap();

    manager.authenticate("code-1").await.unwrap();
    let err = manager.authenticate("code-1").await.unwrap_err();

    assert!(matches!(err, Error::AuthenticationFailed(_)));
    assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn blank_code_is_rejected_without_network() {
    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, Arc::new(MemoryStorage::new()));

    let err = manager.authenticate("   ").await.unwrap_err();

    assert!(matches!(err, Error::AuthenticationFailed(_)));
    assert_eq!(provider.network_calls(), 0);
}

#[tokio::test]
async fn profile_failure_falls_back_to_default_identity() {
    let storage = Arc::new(MemoryStorage::new());
    let store = token_store(storage.clone());
    let provider = Arc::new(MockProvider::new().with_code("code-1", fresh("A")));
    let mut manager =
        manager(&provider, storage).with_profile_fetcher(Arc::new(MockProfile(None)));
    manager.initialize().await.unwrap();

    let token = manager.authenticate("code-1").await.unwrap();
    assert!(token.email.is_none());

    assert_eq!(manager.identity(), &IdentityKey::default());
    let stored = store.load(&IdentityKey::default()).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "A");
}

#[tokio::test]
async fn rejected_refresh_moves_to_failed_and_keeps_stored_token() {
    let storage = Arc::new(MemoryStorage::new());
    let store = token_store(storage.clone());
    store
        .save(&IdentityKey::default(), &stale("A").with_refresh_token("R"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::Failed);
    let stored = store.load(&IdentityKey::default()).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "A");

    assert!(matches!(
        manager.ensure_valid().await,
        Err(Error::NotAuthenticated)
    ));
    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_without_refresh_token_requires_sign_in() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), &stale("A"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::Expired);
    assert_eq!(provider.network_calls(), 0);
    assert!(matches!(
        manager.ensure_valid().await,
        Err(Error::RefreshTokenMissing)
    ));
}

#[tokio::test]
async fn corrupt_stored_token_is_treated_as_absent() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .put("mailgrant-default.json", b"{\"access_token\": 12")
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::NoToken);
    assert!(manager.current_token().await.unwrap().is_none());
}

#[tokio::test]
async fn storage_failure_surfaces_on_initialize() {
    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, Arc::new(BrokenStorage));

    assert!(matches!(
        manager.initialize().await,
        Err(Error::StorageUnavailable(_))
    ));
}

#[tokio::test]
async fn live_token_takes_precedence_over_stored() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), &fresh("STORED"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);
    manager.initialize().await.unwrap();

    manager.set_token(stale("LIVE"));

    assert_eq!(manager.state(), CredentialState::Expired);
    assert!(manager.is_expired().await.unwrap());
    let current = manager.current_token().await.unwrap().unwrap();
    assert_eq!(current.access_token, "LIVE");
}

#[tokio::test]
async fn is_expired_without_any_token() {
    let provider = Arc::new(MockProvider::new());
    let manager = manager(&provider, Arc::new(MemoryStorage::new()));

    assert!(manager.is_expired().await.unwrap());
}

#[tokio::test]
async fn logout_with_nothing_stored_warns() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage.clone());
    manager.initialize().await.unwrap();

    let outcome = manager.logout().await.unwrap();

    assert_eq!(
        outcome,
        LogoutOutcome::Warning(RevokeWarning::NothingStored)
    );
    assert!(storage.is_empty().await);
    assert_eq!(provider.revoke_calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.state(), CredentialState::NoToken);
}

#[tokio::test]
async fn logout_revokes_and_clears() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(
        MockProvider::new().with_code("code-1", fresh("A").with_refresh_token("R")),
    );
    let mut manager = manager(&provider, storage.clone());
    manager.authenticate("code-1").await.unwrap();

    assert_eq!(manager.logout().await.unwrap(), LogoutOutcome::Revoked);

    let revoked = provider.revoked();
    assert_eq!(revoked.len(), 1);
    assert_eq!(revoked[0].refresh_token(), Some("R"));
    assert!(storage.is_empty().await);
    assert!(manager.token().is_none());
    assert_eq!(manager.state(), CredentialState::NoToken);
}

#[tokio::test]
async fn logout_revokes_the_stored_token() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), &fresh("STORED"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);
    manager.initialize().await.unwrap();
    manager.set_token(fresh("LIVE"));

    manager.logout().await.unwrap();

    assert_eq!(provider.revoked()[0].access_token, "STORED");
}

#[tokio::test]
async fn failed_revoke_still_logs_out_locally() {
    let storage = Arc::new(MemoryStorage::new());
    let store = token_store(storage.clone());
    store
        .save(&IdentityKey::default(), &fresh("A").with_refresh_token("R"))
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::new().failing_revoke());
    let mut manager = manager(&provider, storage);
    manager.initialize().await.unwrap();

    let outcome = manager.logout().await.unwrap();
    assert!(matches!(
        outcome,
        LogoutOutcome::Warning(RevokeWarning::RemoteFailed(_))
    ));
    assert_eq!(manager.state(), CredentialState::NoToken);

    manager.clear().await.unwrap();
    assert!(store.load(&IdentityKey::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn clear_discards_without_revoking() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(MockProvider::new().with_code("code-1", fresh("A")));
    let mut manager = manager(&provider, storage.clone());
    manager.authenticate("code-1").await.unwrap();

    manager.clear().await.unwrap();

    assert!(storage.is_empty().await);
    assert_eq!(provider.revoke_calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.state(), CredentialState::NoToken);
}

#[tokio::test]
async fn identity_scopes_the_stored_token() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::new("user@gmail.com"), &fresh("A"))
        .await
        .unwrap();
    let provider = Arc::new(MockProvider::new());

    let mut scoped = manager(&provider, storage.clone()).with_identity("USER@gmail.com");
    assert_eq!(scoped.initialize().await.unwrap(), CredentialState::Valid);

    let mut unscoped = manager(&provider, storage);
    assert_eq!(unscoped.initialize().await.unwrap(), CredentialState::NoToken);
}

#[tokio::test]
async fn file_storage_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let provider = Arc::new(
        MockProvider::new().with_code("code-1", fresh("A").with_refresh_token("R")),
    );

    let mut first = manager(&provider, Arc::new(FileStorage::new(dir.path())));
    first.authenticate("code-1").await.unwrap();
    drop(first);

    let mut second = manager(&provider, Arc::new(FileStorage::new(dir.path())));
    assert_eq!(second.initialize().await.unwrap(), CredentialState::Valid);
    assert_eq!(second.token().unwrap().refresh_token(), Some("R"));
}

#[tokio::test]
async fn from_config_rejects_invalid_config() {
    let err = CredentialManager::from_config(CredentialConfig::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn from_config_uses_configured_storage_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config().with_storage_dir(dir.path());
    token_store(Arc::new(FileStorage::new(dir.path())))
        .save(&IdentityKey::new("user@gmail.com"), &fresh("A"))
        .await
        .unwrap();

    let manager = CredentialManager::from_config(config, Some("user@gmail.com"))
        .await
        .unwrap();

    assert_eq!(manager.state(), CredentialState::Valid);
    assert_eq!(manager.token().unwrap().access_token, "A");
}

#[tokio::test]
async fn open_loads_the_stored_token() {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), &fresh("A"))
        .await
        .unwrap();

    let manager = CredentialManager::open(
        config(),
        token_store(storage),
        Arc::new(MockProvider::new()),
    )
    .await
    .unwrap();

    assert_eq!(manager.state(), CredentialState::Valid);
}

#[tokio::test]
async fn authorization_url_requests_offline_consent() {
    let provider = Arc::new(MockProvider::new());
    let manager = manager(&provider, Arc::new(MemoryStorage::new()));

    let url = manager.authorization_url(Some("xyz")).unwrap();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let has = |k: &str, v: &str| query.iter().any(|(qk, qv)| qk == k && qv == v);

    assert!(url.as_str().starts_with("https://accounts.google.com/"));
    assert!(has("client_id", "client"));
    assert!(has("state", "xyz"));
    assert!(has("access_type", "offline"));
    assert!(has("prompt", "consent"));
    assert!(has("scope", "https://mail.google.com/"));
}

#[tokio::test]
async fn store_token_persists_under_its_email() {
    let storage = Arc::new(MemoryStorage::new());
    let store = token_store(storage.clone());
    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, storage);

    manager
        .store_token(fresh("A").with_email("user@gmail.com"))
        .await
        .unwrap();

    assert_eq!(manager.state(), CredentialState::Valid);
    assert_eq!(manager.identity().as_str(), "user@gmail.com");
    assert!(store
        .contains(&IdentityKey::new("user@gmail.com"))
        .await
        .unwrap());
}

async fn seeded(record: &mailgrant_core::TokenRecord) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    token_store(storage.clone())
        .save(&IdentityKey::default(), record)
        .await
        .unwrap();
    storage
}

#[tokio::test]
async fn outage_during_initialize_keeps_token_expired_until_retry() {
    let storage = seeded(&stale("A").with_refresh_token("R")).await;
    let provider = Arc::new(
        MockProvider::new()
            .refreshing_to(fresh("B"))
            .unavailable_for(1),
    );
    let mut manager = manager(&provider, storage);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::Expired);

    let token = manager.ensure_valid().await.unwrap();
    assert_eq!(token.access_token, "B");
    assert_eq!(token.refresh_token(), Some("R"));
    assert_eq!(manager.state(), CredentialState::Valid);
    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn outage_in_ensure_valid_is_retryable() {
    let storage = seeded(&stale("A").with_refresh_token("R")).await;
    let provider = Arc::new(
        MockProvider::new()
            .refreshing_to(fresh("B"))
            .unavailable_for(2),
    );
    let mut manager = manager(&provider, storage);
    manager.initialize().await.unwrap();

    assert!(matches!(
        manager.ensure_valid().await,
        Err(Error::ProviderUnavailable(_))
    ));
    assert_eq!(manager.state(), CredentialState::Expired);
    assert_eq!(manager.token().unwrap().access_token, "A");

    assert_eq!(manager.ensure_valid().await.unwrap().access_token, "B");
}

#[tokio::test]
async fn token_endpoint_outage_does_not_lock_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "B"})))
        .mount(&server)
        .await;

    let provider = Provider::new(
        "Mock",
        format!("{}/auth", server.uri()),
        format!("{}/token", server.uri()),
    )
    .unwrap();
    let adapter = Arc::new(HttpOAuthAdapter::new(OAuthClient::new("client", provider)));
    let storage = seeded(&stale("A").with_refresh_token("R")).await;
    let mut manager = CredentialManager::new(config(), token_store(storage.clone()), adapter);

    assert_eq!(manager.initialize().await.unwrap(), CredentialState::Expired);
    assert_eq!(manager.ensure_valid().await.unwrap().access_token, "B");

    let stored = token_store(storage)
        .load(&IdentityKey::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "B");
    assert_eq!(stored.refresh_token(), Some("R"));
}

#[tokio::test]
async fn unsaved_refresh_is_not_reported_valid() {
    let inner = seeded(&stale("A").with_refresh_token("R")).await;
    let provider = Arc::new(MockProvider::new().refreshing_to(fresh("B")));
    let mut manager = manager(&provider, Arc::new(ReadOnlyStorage(inner.clone())));

    assert!(matches!(
        manager.initialize().await,
        Err(Error::StorageUnavailable(_))
    ));
    assert_eq!(manager.state(), CredentialState::Expired);
    assert_eq!(manager.token().unwrap().access_token, "A");

    let stored = token_store(inner)
        .load(&IdentityKey::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "A");
}

#[tokio::test]
async fn failed_delete_keeps_local_state() {
    let inner = seeded(&fresh("A")).await;
    let provider = Arc::new(MockProvider::new());
    let mut manager = manager(&provider, Arc::new(ReadOnlyStorage(inner)));
    manager.initialize().await.unwrap();

    assert!(matches!(
        manager.logout().await,
        Err(Error::StorageUnavailable(_))
    ));
    assert_eq!(manager.state(), CredentialState::Valid);

    assert!(matches!(
        manager.clear().await,
        Err(Error::StorageUnavailable(_))
    ));
    assert_eq!(manager.token().unwrap().access_token, "A");
}
