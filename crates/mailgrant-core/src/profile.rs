//! Account profile lookup, used to learn the mailbox address after sign-in.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Gmail API base URL.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Mailbox profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Mailbox address.
    pub email_address: String,
    /// Total number of messages.
    #[serde(default)]
    pub messages_total: Option<u64>,
    /// Total number of threads.
    #[serde(default)]
    pub threads_total: Option<u64>,
    /// Current mailbox history ID.
    #[serde(default)]
    pub history_id: Option<String>,
}

/// Fetches the profile of the account an access token belongs to.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Looks up the profile. Fails with [`Error::Profile`].
    async fn get_profile(&self, access_token: &str) -> Result<Profile>;
}

/// Gmail `users/me/profile` client.
#[derive(Debug, Clone)]
pub struct GmailProfileClient {
    base_url: String,
    http_client: Client,
}

impl GmailProfileClient {
    /// Creates a client for the public Gmail API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE)
    }

    /// Creates a client against another base URL.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: Client::new(),
        }
    }
}

impl Default for GmailProfileClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileFetcher for GmailProfileClient {
    async fn get_profile(&self, access_token: &str) -> Result<Profile> {
        let url = format!("{}/gmail/v1/users/me/profile", self.base_url);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Profile(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Profile(format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Profile(e.to_string()))
    }
}
