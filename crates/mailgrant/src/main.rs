//! `mailgrant` command-line tool.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use mailgrant_core::{
    CredentialConfig, CredentialManager, CredentialState, IdentityKey, LogoutOutcome,
    RevokeWarning, default_config_path,
};
use mailgrant_oauth::AuthorizationCodeFlow;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailgrant=info,mailgrant_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    debug!("Loading configuration from {}", config_path.display());
    let config = CredentialConfig::from_file(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    if let Command::AuthUrl { state } = &cli.command {
        let flow = AuthorizationCodeFlow::new(config.oauth_client()?);
        println!("{}", flow.authorization_url(None, state.as_deref())?);
        return Ok(());
    }

    let mut manager = CredentialManager::from_config(config, cli.identity.as_deref()).await?;

    match cli.command {
        Command::AuthUrl { .. } => {}
        Command::Login { code } => {
            manager.authenticate(&code).await?;
            println!("Signed in as {}", manager.identity());
            if let Some(hint) = identity_hint(cli.identity.as_deref(), &manager) {
                println!("{hint}");
            }
        }
        Command::Status => print_status(&manager),
        Command::Token => {
            let token = manager.ensure_valid().await?;
            println!("{}", token.access_token);
        }
        Command::Logout => match manager.logout().await? {
            LogoutOutcome::Revoked => println!("Token revoked and removed"),
            LogoutOutcome::Warning(RevokeWarning::NothingStored) => {
                println!("No stored token for {}", manager.identity());
            }
            LogoutOutcome::Warning(RevokeWarning::RemoteFailed(reason)) => {
                println!("Token removed locally; revocation failed: {reason}");
            }
        },
        Command::Clear => {
            manager.clear().await?;
            println!("Token removed");
        }
    }

    Ok(())
}

/// Tells the user how to reach a token stored under a different identity
/// than the one later commands will look under.
fn identity_hint(requested: Option<&str>, manager: &CredentialManager) -> Option<String> {
    let email = manager.email()?;
    let default = IdentityKey::new(&manager.config().default_identity);
    let looked_up = requested.map_or(default, IdentityKey::new);
    (&looked_up != manager.identity())
        .then(|| format!("Pass --identity {email} to use this token in later commands"))
}

fn print_status(manager: &CredentialManager) {
    println!("identity: {}", manager.identity());
    let state = match manager.state() {
        CredentialState::Uninitialized => "uninitialized",
        CredentialState::NoToken => "signed out",
        CredentialState::Valid => "valid",
        CredentialState::Expired => "expired",
        CredentialState::Failed => "refresh rejected, sign in again",
    };
    println!("state:    {state}");

    if let Some(token) = manager.token() {
        if let Some(email) = &token.email {
            println!("email:    {email}");
        }
        println!("expires:  {}", token.expires_at.to_rfc3339());
        println!(
            "refresh:  {}",
            if token.refresh_token().is_some() { "yes" } else { "no" }
        );
        if !token.scope.is_empty() {
            let scopes: Vec<&str> = token.scope.iter().map(String::as_str).collect();
            println!("scopes:   {}", scopes.join(" "));
        }
    }
}
