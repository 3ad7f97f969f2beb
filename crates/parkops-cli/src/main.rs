mod cli;

use anyhow::Result;
use clap::Parser;
use cli::commands::{self, SubmitFlags};
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Server(cmd) => commands::server_command(cmd, cli.json).await?,
        Commands::Auth(cmd) => commands::auth_command(cmd, cli.json).await?,
        Commands::Lang { locale } => commands::language(locale.as_deref(), cli.json)?,
        Commands::List { pages } => commands::list_missions(*pages, cli.json).await?,
        Commands::Show { id } => commands::show_mission(id, cli.json).await?,
        Commands::Open { id } => commands::open_mission(id, cli.json).await?,
        Commands::Submit {
            id,
            collect_notes,
            collect_coins,
            refill_notes,
            refill_coins,
            maintenance,
        } => {
            let flags = SubmitFlags {
                collect_notes: *collect_notes,
                collect_coins: *collect_coins,
                refill_notes: *refill_notes,
                refill_coins: *refill_coins,
                maintenance,
            };
            commands::submit_mission(id, flags, cli.json).await?;
        }
        Commands::Notify(cmd) => commands::notify(cmd, cli.json).await?,
        Commands::Push(cmd) => commands::push_command(cmd, cli.json).await?,
        Commands::Clear => commands::clear_missions(cli.json)?,
    }

    Ok(())
}
