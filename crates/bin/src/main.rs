use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;
mod stores;

use cli::{Cli, Commands};
use stores::Stores;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("marquee=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format.into();

    // Needs no stores.
    if let Commands::Capabilities(args) = &cli.command {
        return commands::capabilities::run(args, format);
    }

    let stores = Stores::open(&cli.store).await?;
    match &cli.command {
        Commands::Signup(args) => commands::account::signup(&stores, args, format).await,
        Commands::Login(args) => commands::account::login(&stores, args, format).await,
        Commands::Confirm(args) => commands::account::confirm(&stores, args, format).await,
        Commands::UpdateProfile(args) => {
            commands::account::update_profile(&stores, args, format).await
        }
        Commands::Info => commands::info::run(&stores, format).await,
        Commands::Capabilities(args) => commands::capabilities::run(args, format),
    }
}
