//! Token lifecycle state machine.
//!
//! [`CredentialManager`] owns the in-memory token for one identity and keeps
//! it in step with the [`TokenStore`]:
//!
//! ```text
//! Uninitialized --initialize--> NoToken | Valid | Expired
//! Expired --refresh ok--> Valid        Expired --refresh rejected--> Failed
//! Expired --provider unavailable--> Expired
//! any --authenticate--> Valid          any --logout/clear--> NoToken
//! ```
//!
//! Mutating operations take `&mut self`; share a manager between tasks with
//! `Arc<tokio::sync::Mutex<CredentialManager>>`. Separate processes sharing a
//! storage key may both refresh the same expired token; the last write wins.

use std::fmt;
use std::sync::Arc;

use mailgrant_oauth::AuthorizationCodeFlow;
use tracing::{debug, info, warn};
use url::Url;

use crate::adapter::{HttpOAuthAdapter, OAuthClientAdapter};
use crate::config::{CredentialConfig, ProviderKind};
use crate::error::{Error, Result};
use crate::profile::{GmailProfileClient, ProfileFetcher};
use crate::record::{IdentityKey, TokenRecord};
use crate::store::{FileStorage, TokenStore};

/// Lifecycle state of the managed credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Storage has not been consulted yet.
    Uninitialized,
    /// No token is held.
    NoToken,
    /// The access token can be used.
    Valid,
    /// The access token has expired.
    Expired,
    /// The provider rejected the refresh token.
    Failed,
}

/// Non-fatal condition reported by [`CredentialManager::logout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeWarning {
    /// No token was stored, so nothing was revoked.
    NothingStored,
    /// The revocation round-trip failed; local state was discarded anyway.
    RemoteFailed(String),
}

/// Result of a logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The stored token was revoked with the provider.
    Revoked,
    /// Logged out locally without a confirmed revocation.
    Warning(RevokeWarning),
}

/// Manages the `OAuth2` credential for one account.
pub struct CredentialManager {
    config: CredentialConfig,
    store: TokenStore,
    oauth: Arc<dyn OAuthClientAdapter>,
    profile: Option<Arc<dyn ProfileFetcher>>,
    identity: IdentityKey,
    token: Option<TokenRecord>,
    state: CredentialState,
}

impl CredentialManager {
    /// Creates an uninitialized manager for the configured default identity.
    pub fn new(
        config: CredentialConfig,
        store: TokenStore,
        oauth: Arc<dyn OAuthClientAdapter>,
    ) -> Self {
        let identity = IdentityKey::new(&config.default_identity);
        Self {
            config,
            store,
            oauth,
            profile: None,
            identity,
            token: None,
            state: CredentialState::Uninitialized,
        }
    }

    /// Scopes the manager to an account email instead of the default identity.
    #[must_use]
    pub fn with_identity(mut self, email: &str) -> Self {
        self.identity = IdentityKey::for_account(Some(email), &self.config.default_identity);
        self
    }

    /// Enables the profile lookup that learns the account email after sign-in.
    #[must_use]
    pub fn with_profile_fetcher(mut self, profile: Arc<dyn ProfileFetcher>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Creates a manager and loads its persisted token in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if storage cannot be read.
    pub async fn open(
        config: CredentialConfig,
        store: TokenStore,
        oauth: Arc<dyn OAuthClientAdapter>,
    ) -> Result<Self> {
        let mut manager = Self::new(config, store, oauth);
        manager.initialize().await?;
        Ok(manager)
    }

    /// Builds and initializes a manager with file storage, the HTTP protocol
    /// client, and (for Google) the Gmail profile lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or storage is unavailable.
    pub async fn from_config(config: CredentialConfig, identity: Option<&str>) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(FileStorage::new(config.resolved_storage_dir()));
        let store = TokenStore::new(storage, config.storage_key_prefix.clone());
        let oauth = Arc::new(HttpOAuthAdapter::new(config.oauth_client()?));
        let is_google = config.provider == ProviderKind::Google;

        let mut manager = Self::new(config, store, oauth);
        if let Some(email) = identity {
            manager = manager.with_identity(email);
        }
        if is_google {
            manager = manager.with_profile_fetcher(Arc::new(GmailProfileClient::new()));
        }

        manager.initialize().await?;
        Ok(manager)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CredentialState {
        self.state
    }

    /// Identity the token is stored under.
    #[must_use]
    pub const fn identity(&self) -> &IdentityKey {
        &self.identity
    }

    /// Account email, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.token.as_ref().and_then(|t| t.email.as_deref())
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// URL the user opens to grant access; the resulting code goes to
    /// [`authenticate`](Self::authenticate).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured provider or redirect URI is invalid.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<Url> {
        let flow = AuthorizationCodeFlow::new(self.config.oauth_client()?);
        Ok(flow.authorization_url(None, state)?)
    }

    /// In-memory token, without consulting storage.
    #[must_use]
    pub const fn token(&self) -> Option<&TokenRecord> {
        self.token.as_ref()
    }

    /// Loads the persisted token and classifies it.
    ///
    /// An expired token with a refresh token is refreshed silently; if the
    /// provider rejects the refresh the manager ends up [`CredentialState::Failed`]
    /// without returning an error. If the provider cannot be reached, or the
    /// token has no refresh token, it stays [`CredentialState::Expired`] and
    /// [`ensure_valid`](Self::ensure_valid) decides what to do next. A corrupt
    /// stored record is logged and treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if storage cannot be read or
    /// the refreshed token cannot be written.
    pub async fn initialize(&mut self) -> Result<CredentialState> {
        self.token = self.load_stored().await?;
        self.state = self.classify();
        debug!(identity = %self.identity, state = ?self.state, "loaded credential");

        if self.state == CredentialState::Expired {
            if self.token.as_ref().and_then(TokenRecord::refresh_token).is_some() {
                match self.refresh().await {
                    Ok(()) => {}
                    Err(e @ (Error::RefreshFailed(_) | Error::ProviderUnavailable(_))) => {
                        warn!(identity = %self.identity, "silent refresh failed: {e}");
                    }
                    Err(e) => return Err(e),
                }
            } else {
                debug!(identity = %self.identity, "token expired and no refresh token is stored");
            }
        }

        Ok(self.state)
    }

    /// Exchanges a one-time authorization code for a token and persists it.
    ///
    /// The account email is looked up on a best-effort basis; if the lookup
    /// fails the token is stored under the default identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] if `code` is empty or the
    /// provider rejects it (codes are single use), or
    /// [`Error::StorageUnavailable`] if the token cannot be saved.
    pub async fn authenticate(&mut self, code: &str) -> Result<&TokenRecord> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::AuthenticationFailed(
                "no authorization code supplied".into(),
            ));
        }

        let mut record = self
            .oauth
            .exchange_code(code)
            .await
            .map_err(|e| match e {
                Error::AuthenticationFailed(_) => e,
                other => Error::AuthenticationFailed(other.to_string()),
            })?;

        if !record.has_access_token() {
            return Err(Error::AuthenticationFailed(
                "provider returned no access token".into(),
            ));
        }

        record.email = self.lookup_email(&record.access_token).await;
        let identity =
            IdentityKey::for_account(record.email.as_deref(), &self.config.default_identity);

        self.store.save(&identity, &record).await?;
        self.identity = identity;
        self.state = CredentialState::Valid;
        info!(identity = %self.identity, "authenticated");

        Ok(&*self.token.insert(record))
    }

    /// Returns a token that is valid now, refreshing it first if it expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] when no token is held or a previous
    /// refresh was rejected (no network call is made),
    /// [`Error::RefreshTokenMissing`] when the token expired and cannot be
    /// renewed, [`Error::RefreshFailed`] when the provider rejects the refresh,
    /// or [`Error::ProviderUnavailable`] when it cannot be reached (the token
    /// stays expired and a later call retries).
    pub async fn ensure_valid(&mut self) -> Result<&TokenRecord> {
        if self.state == CredentialState::Uninitialized {
            self.initialize().await?;
        }

        // A token that was valid earlier may have expired since.
        if self.state == CredentialState::Valid {
            self.state = self.classify();
        }

        match self.state {
            CredentialState::Valid => {}
            CredentialState::Expired => self.refresh().await?,
            CredentialState::NoToken | CredentialState::Failed | CredentialState::Uninitialized => {
                return Err(Error::NotAuthenticated);
            }
        }

        self.token.as_ref().ok_or(Error::NotAuthenticated)
    }

    /// Freshest known token: the in-memory one, otherwise whatever storage holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if storage cannot be read.
    pub async fn current_token(&self) -> Result<Option<TokenRecord>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        self.load_stored().await
    }

    /// Returns true if the freshest known token has expired, or there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if storage cannot be read.
    pub async fn is_expired(&self) -> Result<bool> {
        Ok(self
            .current_token()
            .await?
            .is_none_or(|t| self.oauth.is_expired(&t)))
    }

    /// Replaces the in-memory token without persisting it.
    ///
    /// The live token takes precedence over the stored one for expiry checks.
    pub fn set_token(&mut self, record: TokenRecord) {
        self.token = Some(record);
        self.state = self.classify();
    }

    /// Replaces the token and persists it under its email (or the default identity).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the token cannot be saved.
    pub async fn store_token(&mut self, record: TokenRecord) -> Result<()> {
        let identity =
            IdentityKey::for_account(record.email.as_deref(), &self.config.default_identity);
        self.store.save(&identity, &record).await?;
        self.identity = identity;
        self.set_token(record);
        Ok(())
    }

    /// Revokes the stored token and discards local state.
    ///
    /// The stored record is read fresh so a token written by another process
    /// is the one revoked. Revocation is best effort: a failed round-trip is
    /// reported as [`RevokeWarning::RemoteFailed`] and the local logout still
    /// happens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if storage cannot be read or cleared.
    pub async fn logout(&mut self) -> Result<LogoutOutcome> {
        let outcome = match self.load_stored().await? {
            None => {
                warn!(identity = %self.identity, "logout: no stored token to revoke");
                LogoutOutcome::Warning(RevokeWarning::NothingStored)
            }
            Some(record) => match self.oauth.revoke(&record).await {
                Ok(()) => {
                    info!(identity = %self.identity, "token revoked");
                    LogoutOutcome::Revoked
                }
                Err(e) => {
                    warn!(identity = %self.identity, "logout: revocation failed: {e}");
                    LogoutOutcome::Warning(RevokeWarning::RemoteFailed(e.to_string()))
                }
            },
        };

        self.store.clear(&self.identity).await?;
        self.discard();
        Ok(outcome)
    }

    /// Deletes the stored token and discards local state without contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if storage cannot be cleared.
    pub async fn clear(&mut self) -> Result<()> {
        self.store.clear(&self.identity).await?;
        self.discard();
        info!(identity = %self.identity, "credential cleared");
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        let Some(refresh_token) = self
            .token
            .as_ref()
            .and_then(TokenRecord::refresh_token)
            .map(str::to_string)
        else {
            return Err(Error::RefreshTokenMissing);
        };

        let response = match self.oauth.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(e @ Error::RefreshFailed(_)) => {
                // The stale record stays in storage until logout or clear.
                self.state = CredentialState::Failed;
                warn!(identity = %self.identity, "refresh rejected: {e}");
                return Err(e);
            }
            Err(e) => {
                warn!(identity = %self.identity, "refresh attempt failed, will retry: {e}");
                return Err(e);
            }
        };

        let Some(mut record) = self.token.clone() else {
            return Err(Error::NotAuthenticated);
        };
        record.merge_refresh(response);

        self.store.save(&self.identity, &record).await?;
        info!(identity = %self.identity, expires_at = %record.expires_at, "access token refreshed");
        self.token = Some(record);
        self.state = CredentialState::Valid;
        Ok(())
    }

    async fn load_stored(&self) -> Result<Option<TokenRecord>> {
        match self.store.load(&self.identity).await {
            Err(Error::StorageCorrupt { key, reason }) => {
                warn!(%key, "ignoring unreadable stored token: {reason}");
                Ok(None)
            }
            other => other,
        }
    }

    async fn lookup_email(&self, access_token: &str) -> Option<String> {
        let Some(profile) = &self.profile else {
            debug!("no profile lookup configured");
            return None;
        };

        match profile.get_profile(access_token).await {
            Ok(profile) => Some(profile.email_address),
            Err(e) => {
                warn!("profile lookup failed, storing under the default identity: {e}");
                None
            }
        }
    }

    fn classify(&self) -> CredentialState {
        match &self.token {
            Some(t) if t.has_access_token() && !self.oauth.is_expired(t) => CredentialState::Valid,
            Some(t) if t.has_access_token() || t.refresh_token().is_some() => {
                CredentialState::Expired
            }
            _ => CredentialState::NoToken,
        }
    }

    fn discard(&mut self) {
        self.token = None;
        self.state = CredentialState::NoToken;
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
