//! Error types for `OAuth2` protocol operations.

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `OAuth2` error from server.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Non-success HTTP status whose body is not an `OAuth2` error document.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Invalid token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The provider does not support the requested operation.
    #[error("Provider {provider} does not support {operation}")]
    Unsupported {
        /// Provider name.
        provider: String,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true if the server rejected the grant (used, expired or revoked
    /// code or refresh token).
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::OAuth { error, .. } if error == "invalid_grant")
    }

    /// Returns true if the provider answered and refused the request.
    ///
    /// Transport failures, server errors, rate limiting and unreadable
    /// bodies are not rejections; the same request may succeed later.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::OAuth { error, .. } => {
                !matches!(error.as_str(), "server_error" | "temporarily_unavailable")
            }
            Self::Status { status, .. } => {
                (400..500).contains(status) && !matches!(*status, 408 | 429)
            }
            _ => false,
        }
    }
}
