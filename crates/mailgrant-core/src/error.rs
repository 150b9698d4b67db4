//! Error types for the credential manager.

use thiserror::Error;

/// Errors that can occur while managing credentials.
#[derive(Debug, Error)]
pub enum Error {
    /// The authorization code was missing, malformed, already used, or
    /// rejected by the provider.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No usable token is held; the caller must authenticate first.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The provider rejected the refresh token (typically revoked externally).
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The provider could not be reached or failed on its side; the same
    /// request may succeed later.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The access token expired and no refresh token is available.
    #[error("Access token expired and no refresh token is available")]
    RefreshTokenMissing,

    /// Storage backend I/O failure.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The stored record could not be decoded.
    #[error("Stored token for {key} is corrupt: {reason}")]
    StorageCorrupt {
        /// Storage key of the unreadable record.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// Token revocation round-trip failed.
    #[error("Token revocation failed: {0}")]
    Revoke(String),

    /// Profile lookup failed.
    #[error("Profile lookup failed: {0}")]
    Profile(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `OAuth2` client setup error.
    #[error("OAuth error: {0}")]
    OAuth(#[from] mailgrant_oauth::Error),
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Self::StorageUnavailable(error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::StorageUnavailable(error.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
