//! Example: sign in to Gmail and keep the token fresh.
//!
//! Register an OAuth client of type "Desktop app" in the Google Cloud console
//! and set:
//!
//! ```bash
//! export OAUTH_CLIENT_ID="...apps.googleusercontent.com"
//! export OAUTH_CLIENT_SECRET="..."
//! cargo run -p mailgrant-core --example gmail_login
//! ```
//!
//! Tokens are written to a temporary directory and discarded at exit.

use std::env;
use std::io::{self, Write};

use anyhow::Context;
use mailgrant_core::{CredentialConfig, CredentialManager, CredentialState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailgrant_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client_id = env::var("OAUTH_CLIENT_ID").context("OAUTH_CLIENT_ID is not set")?;
    let storage_dir = tempfile::TempDir::new()?;

    let mut config = CredentialConfig::new(client_id, "http://localhost:8080")
        .with_storage_dir(storage_dir.path());
    if let Ok(secret) = env::var("OAUTH_CLIENT_SECRET") {
        config = config.with_client_secret(secret);
    }

    let mut manager = CredentialManager::from_config(config, None).await?;
    let url = manager.authorization_url(Some("example"))?;
    println!("Open this URL and approve access:\n\n{url}\n");

    print!("Paste the `code` parameter from the redirect: ");
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;

    manager.authenticate(code.trim()).await?;
    println!("Signed in as {}", manager.identity());

    let token = manager.ensure_valid().await?;
    println!("Authorization: {}", token.authorization_header());
    println!("Expires at {}", token.expires_at);
    assert_eq!(manager.state(), CredentialState::Valid);

    Ok(())
}
