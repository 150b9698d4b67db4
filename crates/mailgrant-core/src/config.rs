//! Credential manager configuration.

use std::path::{Path, PathBuf};

use mailgrant_oauth::{AccessType, ApprovalPrompt, OAuthClient, Provider};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::DEFAULT_IDENTITY;

/// Application directory name under the platform data/config directories.
const APP_DIR: &str = "mailgrant";

/// Which `OAuth2` provider preset to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google / Gmail.
    #[default]
    Google,
    /// Microsoft / Outlook.
    Microsoft,
    /// Yahoo Mail.
    Yahoo,
}

impl ProviderKind {
    /// Builds the provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the preset URLs fail to parse.
    pub fn provider(self) -> Result<Provider> {
        Ok(match self {
            Self::Google => Provider::google()?,
            Self::Microsoft => Provider::microsoft()?,
            Self::Yahoo => Provider::yahoo()?,
        })
    }
}

/// Settings for one credential manager, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// `OAuth2` client ID.
    pub client_id: String,
    /// `OAuth2` client secret.
    pub client_secret: Option<String>,
    /// Redirect URI registered with the provider.
    pub redirect_uri: String,
    /// Requested scopes; provider defaults when empty.
    pub scopes: Vec<String>,
    /// Online or offline access.
    pub access_type: AccessType,
    /// Consent prompt behaviour.
    pub approval_prompt: ApprovalPrompt,
    /// Provider preset.
    pub provider: ProviderKind,
    /// Prefix for storage keys.
    pub storage_key_prefix: String,
    /// Identity used until the account email is known.
    pub default_identity: String,
    /// Directory for file storage; platform data directory when unset.
    pub storage_dir: Option<PathBuf>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: String::new(),
            scopes: Vec::new(),
            access_type: AccessType::Offline,
            approval_prompt: ApprovalPrompt::Force,
            provider: ProviderKind::Google,
            storage_key_prefix: "mailgrant-".to_string(),
            default_identity: DEFAULT_IDENTITY.to_string(),
            storage_dir: None,
        }
    }
}

impl CredentialConfig {
    /// Creates a configuration with the required client settings.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            ..Self::default()
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the storage key prefix.
    #[must_use]
    pub fn with_storage_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_key_prefix = prefix.into();
        self
    }

    /// Sets the directory used for file storage.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TOML is malformed or invalid.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Checks that the required settings are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing setting.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id is required".into()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(Error::Config("redirect_uri is required".into()));
        }
        if url::Url::parse(&self.redirect_uri).is_err() {
            return Err(Error::Config(format!(
                "redirect_uri is not a valid URL: {}",
                self.redirect_uri
            )));
        }
        Ok(())
    }

    /// Directory used by file storage.
    #[must_use]
    pub fn resolved_storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(default_storage_dir)
    }

    /// Builds the `OAuth2` protocol client for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider preset cannot be built.
    pub fn oauth_client(&self) -> Result<OAuthClient> {
        let mut client = OAuthClient::new(&self.client_id, self.provider.provider()?)
            .with_redirect_uri(&self.redirect_uri)
            .with_scopes(self.scopes.clone())
            .with_access_type(self.access_type)
            .with_approval_prompt(self.approval_prompt);

        if let Some(secret) = &self.client_secret {
            client = client.with_client_secret(secret);
        }

        Ok(client)
    }
}

/// Default location of the configuration file.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
