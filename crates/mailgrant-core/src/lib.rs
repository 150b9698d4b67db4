//! # mailgrant-core
//!
//! `OAuth2` credential lifecycle for mail provider APIs.
//!
//! This crate provides:
//! - [`CredentialManager`] - sign-in, expiry checks, silent refresh and logout
//! - [`TokenStore`] - per-identity token persistence over pluggable [`Storage`]
//! - Storage backends: files, `SQLite`, memory and (with the `keyring`
//!   feature) the system keyring
//! - [`CredentialConfig`] - TOML configuration
//!
//! ```no_run
//! use mailgrant_core::{CredentialConfig, CredentialManager};
//!
//! # async fn run() -> mailgrant_core::Result<()> {
//! let config = CredentialConfig::from_file("config.toml")?;
//! let mut manager = CredentialManager::from_config(config, None).await?;
//! let token = manager.ensure_valid().await?;
//! println!("{}", token.authorization_header());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod config;
mod error;
pub mod manager;
pub mod profile;
pub mod record;
pub mod store;

pub use adapter::{HttpOAuthAdapter, OAuthClientAdapter};
pub use config::{CredentialConfig, ProviderKind, default_config_path};
pub use error::{Error, Result};
pub use manager::{CredentialManager, CredentialState, LogoutOutcome, RevokeWarning};
pub use profile::{GmailProfileClient, Profile, ProfileFetcher};
pub use record::{DEFAULT_IDENTITY, IdentityKey, TokenRecord};
#[cfg(feature = "keyring")]
pub use store::KeyringStorage;
pub use store::{FileStorage, MemoryStorage, SqliteStorage, Storage, TokenStore};
