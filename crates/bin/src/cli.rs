//! CLI argument definitions for the Marquee binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use marquee::Role;

use crate::output::OutputFormat;

/// Output format flag
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// Aligned, human-readable text
    Human,
    /// One JSON document per command
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Human => OutputFormat::Human,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Marquee account and tenant administration
#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "Marquee: session and tenant bootstrap for signage admins")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: Format,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where accounts and tenant records are kept
#[derive(clap::Args, Debug, Clone)]
pub struct StoreArgs {
    /// Data directory holding identities.json and tenants.json
    #[arg(short = 'D', long, global = true, env = "MARQUEE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON file with session settings
    #[arg(short, long, global = true, env = "MARQUEE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Refuse sign-in until the account's email is confirmed
    #[arg(long, global = true, env = "MARQUEE_REQUIRE_CONFIRMATION")]
    pub require_confirmation: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register an account and set up its company
    Signup(SignupArgs),
    /// Sign in, print the resolved session, then sign out
    Login(CredentialArgs),
    /// Mark an account's email as confirmed
    Confirm(ConfirmArgs),
    /// Sign in and update the account's profile
    UpdateProfile(UpdateProfileArgs),
    /// Show the capabilities granted to a role
    Capabilities(CapabilitiesArgs),
    /// Show account, company and profile counts
    Info,
}

/// Email and password of an existing account
#[derive(clap::Args, Debug)]
pub struct CredentialArgs {
    /// Account email
    #[arg(short, long)]
    pub email: String,

    /// Account password
    #[arg(short, long, env = "MARQUEE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for the signup command
#[derive(clap::Args, Debug)]
pub struct SignupArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Name of the company to create
    #[arg(long)]
    pub company: String,
}

/// Arguments for the confirm command
#[derive(clap::Args, Debug)]
pub struct ConfirmArgs {
    /// Account email
    #[arg(short, long)]
    pub email: String,
}

/// Arguments for the update-profile command
#[derive(clap::Args, Debug)]
pub struct UpdateProfileArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub avatar_url: Option<String>,

    /// Contact email stored on the profile
    #[arg(long)]
    pub profile_email: Option<String>,
}

/// Arguments for the capabilities command
#[derive(clap::Args, Debug)]
pub struct CapabilitiesArgs {
    /// Role to show; every role when omitted
    #[arg(short, long)]
    pub role: Option<Role>,
}
