//! CLI entry point for the portal client.

pub mod auth;
pub mod request;

use clap::{Parser, Subcommand};

/// Hackathon portal CLI
#[derive(Parser, Debug)]
#[command(name = "hackportal", version, about = "Hackathon portal API client")]
pub struct Cli {
    /// Credential profile to use
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// GET a portal endpoint and print the JSON response
    Get(GetArgs),
    /// POST JSON to a portal endpoint and print the response
    Post(PostArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Show whether a session is stored
    Status,
    /// Sign out and clear stored credentials
    Logout,
}

/// Arguments for `hackportal auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Account email
    pub email: String,

    /// Password (read from stdin when omitted)
    #[arg(long, env = "HACKPORTAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for `hackportal get`.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Endpoint path, e.g. /teams
    pub path: String,

    /// Query parameters as key=value
    #[arg(short, long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,
}

/// Arguments for `hackportal post`.
#[derive(Parser, Debug)]
pub struct PostArgs {
    /// Endpoint path, e.g. /appeals
    pub path: String,

    /// JSON request body
    #[arg(short, long, default_value = "{}")]
    pub data: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw}"))
}
