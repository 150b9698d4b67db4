//! Boundary to the `OAuth2` provider.

use async_trait::async_trait;
use chrono::Utc;
use mailgrant_oauth::{AuthorizationCodeFlow, OAuthClient};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::TokenRecord;

/// Token operations the credential manager needs from an `OAuth2` provider.
///
/// Each call is a single round-trip with no retry.
#[async_trait]
pub trait OAuthClientAdapter: Send + Sync {
    /// Exchanges a one-time authorization code for a token.
    ///
    /// Fails with [`Error::AuthenticationFailed`] if the provider rejects the
    /// code, including when it has already been used.
    async fn exchange_code(&self, code: &str) -> Result<TokenRecord>;

    /// Obtains a new access token with `refresh_token`.
    ///
    /// The returned record carries a refresh token only if the provider
    /// rotated it. Fails with [`Error::RefreshFailed`] when the provider
    /// rejects the refresh token, and with [`Error::ProviderUnavailable`]
    /// when the attempt should be retried.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord>;

    /// Revokes `record` with the provider. Fails with [`Error::Revoke`].
    async fn revoke(&self, record: &TokenRecord) -> Result<()>;

    /// Returns true if `record` has expired.
    fn is_expired(&self, record: &TokenRecord) -> bool {
        record.is_expired_at(Utc::now())
    }
}

/// [`OAuthClientAdapter`] over the HTTP protocol client.
#[derive(Debug)]
pub struct HttpOAuthAdapter {
    flow: AuthorizationCodeFlow,
}

impl HttpOAuthAdapter {
    /// Wraps a configured client.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self {
            flow: AuthorizationCodeFlow::new(client),
        }
    }

    /// Returns the underlying authorization code flow.
    #[must_use]
    pub const fn flow(&self) -> &AuthorizationCodeFlow {
        &self.flow
    }
}

#[async_trait]
impl OAuthClientAdapter for HttpOAuthAdapter {
    async fn exchange_code(&self, code: &str) -> Result<TokenRecord> {
        self.flow
            .exchange_code(code, None)
            .await
            .map(TokenRecord::from)
            .map_err(|e| Error::AuthenticationFailed(e.to_string()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenRecord> {
        self.flow
            .client()
            .refresh(refresh_token)
            .await
            .map(TokenRecord::from)
            .map_err(|e| {
                if e.is_rejection() {
                    Error::RefreshFailed(e.to_string())
                } else {
                    Error::ProviderUnavailable(e.to_string())
                }
            })
    }

    async fn revoke(&self, record: &TokenRecord) -> Result<()> {
        // Revoking the refresh token also kills every access token minted from it.
        let token = match record.refresh_token() {
            Some(refresh_token) => refresh_token,
            None if record.has_access_token() => record.access_token.as_str(),
            None => return Err(Error::Revoke("record holds no token".into())),
        };

        debug!("revoking stored credential");
        self.flow
            .client()
            .revoke_token(token)
            .await
            .map_err(|e| Error::Revoke(e.to_string()))
    }
}
