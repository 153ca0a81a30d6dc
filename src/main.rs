//! hackportal CLI binary entry point.

use clap::Parser;
use hackportal::cli::{AuthCommands, Cli, Commands};
use hackportal::config::ClientConfig;
use hackportal::http::AuthClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hackportal=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    let client = AuthClient::from_config(config)?;

    match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => {
                hackportal::cli::auth::handle_login(&client, &args.email, args.password).await
            }
            AuthCommands::Status => hackportal::cli::auth::handle_status(&client).await,
            AuthCommands::Logout => hackportal::cli::auth::handle_logout(&client).await,
        },
        Commands::Get(args) => {
            hackportal::cli::request::handle_get(&client, &args.path, &args.query).await
        }
        Commands::Post(args) => {
            hackportal::cli::request::handle_post(&client, &args.path, &args.data).await
        }
    }
}
