//! `OAuth2` client and authorization flows.

mod code;

pub use code::AuthorizationCodeFlow;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Whether the application needs access while the user is not present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Request a refresh token so access can be renewed silently.
    #[default]
    Offline,
    /// Access token only.
    Online,
}

impl AccessType {
    /// Returns the query parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
        }
    }
}

/// Whether the consent screen is shown again for an already-approved client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPrompt {
    /// Let the provider decide.
    Auto,
    /// Always prompt, which makes the provider issue a fresh refresh token.
    #[default]
    Force,
}

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Requested scopes (provider defaults when empty).
    pub scopes: Vec<String>,
    /// Online or offline access.
    pub access_type: AccessType,
    /// Consent prompt behaviour.
    pub approval_prompt: ApprovalPrompt,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            scopes: Vec::new(),
            access_type: AccessType::default(),
            approval_prompt: ApprovalPrompt::default(),
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the access type.
    #[must_use]
    pub const fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    /// Sets the approval prompt behaviour.
    #[must_use]
    pub const fn with_approval_prompt(mut self, prompt: ApprovalPrompt) -> Self {
        self.approval_prompt = prompt;
        self
    }

    /// Replaces the HTTP client (for proxies or custom timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Scopes to request: the configured ones, or the provider defaults.
    #[must_use]
    pub fn effective_scopes(&self) -> &[String] {
        if self.scopes.is_empty() {
            &self.provider.default_scopes
        } else {
            &self.scopes
        }
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails. A used, expired or unknown code
    /// comes back as an `invalid_grant` OAuth error.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Token> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &self.client_id);

        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.insert("redirect_uri", uri);
        }

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        debug!(provider = %self.provider.name, "exchanging authorization code");
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        read_token(response).await
    }

    /// Requests a new access token with a refresh token.
    ///
    /// The returned token carries a refresh token only if the server issued
    /// a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh request fails or is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        debug!(provider = %self.provider.name, "refreshing access token");
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        read_token(response).await
    }

    /// Refreshes an access token, keeping the old refresh token if the server
    /// did not return a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let mut new_token = self.refresh(token.refresh_token()?).await?;

        // Preserve refresh token if not returned
        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }

        Ok(new_token)
    }

    /// Revokes an access or refresh token with the provider.
    ///
    /// Revoking a refresh token also invalidates the access tokens minted from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if the provider has no revocation
    /// endpoint, or an error if the provider rejects the request.
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        let revoke_url = self
            .provider
            .revoke_url
            .clone()
            .ok_or_else(|| Error::Unsupported {
                provider: self.provider.name.clone(),
                operation: "token revocation",
            })?;

        debug!(provider = %self.provider.name, "revoking token");
        let response = self
            .http_client
            .post(revoke_url)
            .form(&[("token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }
}

async fn read_token(response: Response) -> Result<Token> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let token_response: TokenResponse = response.json().await?;
    Token::from_response(token_response)
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorResponse>(&body).map_or_else(
            |_| Error::Status {
                status: status.as_u16(),
                body,
            },
            ErrorResponse::into_error,
        ),
        Err(e) => e.into(),
    }
}
