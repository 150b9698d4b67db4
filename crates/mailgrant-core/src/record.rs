//! Credential snapshot and identity keys.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity used when no account email is known.
pub const DEFAULT_IDENTITY: &str = "default";

/// One credential snapshot for an account.
///
/// An empty `access_token` means no token has been obtained yet; such a
/// record is never valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer credential for API calls.
    pub access_token: String,
    /// Long-lived credential used to renew the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry of `access_token`.
    pub expires_at: DateTime<Utc>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: BTreeSet<String>,
    /// Account email, once a profile lookup succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Token type, passed through from the provider.
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenRecord {
    /// Creates a bearer record with no refresh token, scope or email.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
            scope: BTreeSet::new(),
            email: None,
            token_type: default_token_type(),
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the account email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns true if an access token has been obtained.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Returns true if the access token has expired at `now`.
    ///
    /// Strict comparison, no tolerance buffer.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns true if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the record holds an access token that has not expired at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.has_access_token() && !self.is_expired_at(now)
    }

    /// Returns true if the record can be used for an API call right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Returns the refresh token, ignoring empty strings.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Folds a refresh response into this record.
    ///
    /// The access token, expiry and token type are replaced. Scope is
    /// replaced only if the response carried one. The refresh token is
    /// replaced only if the provider rotated it. The email is kept.
    pub fn merge_refresh(&mut self, response: Self) {
        self.access_token = response.access_token;
        self.expires_at = response.expires_at;
        self.token_type = response.token_type;
        if !response.scope.is_empty() {
            self.scope = response.scope;
        }
        if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh_token);
        }
    }

    /// Value for an HTTP `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl From<mailgrant_oauth::Token> for TokenRecord {
    fn from(token: mailgrant_oauth::Token) -> Self {
        let scope = token.scopes().map(str::to_string).collect();
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
            scope,
            email: None,
            token_type: token.token_type,
        }
    }
}

/// Storage identity for a token record.
///
/// Lowercased; characters outside `[a-z0-9@._-]` become `-`. Blank input
/// maps to [`DEFAULT_IDENTITY`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Normalizes `raw` into an identity key.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|ch| {
                let lower = ch.to_ascii_lowercase();
                if lower.is_ascii_alphanumeric() || matches!(lower, '@' | '.' | '_' | '-') {
                    lower
                } else {
                    '-'
                }
            })
            .collect();

        if normalized.trim_matches(|c| c == '-' || c == '.').is_empty() {
            Self(DEFAULT_IDENTITY.to_string())
        } else {
            Self(normalized)
        }
    }

    /// Key for an account: the email when known, otherwise `default_identity`.
    #[must_use]
    pub fn for_account(email: Option<&str>, default_identity: &str) -> Self {
        match email.filter(|e| !e.trim().is_empty()) {
            Some(email) => Self::new(email),
            None => Self::new(default_identity),
        }
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdentityKey {
    fn default() -> Self {
        Self(DEFAULT_IDENTITY.to_string())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
