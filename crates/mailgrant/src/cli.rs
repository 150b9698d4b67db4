//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sign in to a mail provider and manage the stored `OAuth2` token.
#[derive(Parser, Debug)]
#[command(name = "mailgrant", version, about)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Account email whose token to use
    #[arg(short, long, global = true, value_name = "EMAIL")]
    pub identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the URL to open in a browser to grant access
    AuthUrl {
        /// Opaque value echoed back on the redirect
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange an authorization code for a token and store it
    Login {
        /// Code from the redirect
        code: String,
    },
    /// Show the state of the stored token
    Status,
    /// Print a valid access token, refreshing it if needed
    Token,
    /// Revoke the stored token and delete it
    Logout,
    /// Delete the stored token without contacting the provider
    Clear,
}
