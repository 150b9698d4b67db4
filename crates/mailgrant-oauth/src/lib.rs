//! # mailgrant-oauth
//!
//! `OAuth2` protocol client for mail provider APIs.
//!
//! ## Features
//!
//! - **Authorization Code Flow**: consent URL construction and code-for-token
//!   exchange
//! - **Token refresh**: renew access tokens, preserving the refresh token when
//!   the provider does not rotate it
//! - **Revocation**: invalidate a token with the provider
//! - **Provider configurations**: Gmail, Outlook, Yahoo, or any custom endpoints
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgrant_oauth::{AuthorizationCodeFlow, OAuthClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OAuthClient::new("your_client_id", Provider::google()?)
//!         .with_client_secret("your_secret")
//!         .with_redirect_uri("http://localhost:8080/oauth/callback");
//!
//!     let flow = AuthorizationCodeFlow::new(client);
//!     println!("Visit: {}", flow.authorization_url(None, Some("state"))?);
//!
//!     let token = flow.exchange_code("code_from_redirect", None).await?;
//!     let renewed = flow.client().refresh_token(&token).await?;
//!     flow.client().revoke_token(renewed.refresh_token()?).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AccessType, ApprovalPrompt, AuthorizationCodeFlow, OAuthClient};
pub use provider::Provider;
pub use token::{Token, TokenResponse};
