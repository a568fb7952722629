mod commands;
mod config;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scrobble_sync_http::HttpTransport;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scrobble-sync")]
#[command(about = "Keep Spotify playlists in step with your listening history")]
struct Cli {
    /// Path to the config file (defaults to ~/.config/scrobble-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add recently played tracks to the recent playlist
    Recent,
    /// Add most played tracks to the top playlist
    Top,
}

impl Command {
    fn prefix(&self) -> &'static str {
        match self {
            Command::Recent => "[Recent Tracks]",
            Command::Top => "[Top Tracks]",
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;
    let transport = Arc::new(HttpTransport::new()?);

    match cli.command {
        Command::Recent => commands::recent::run(transport, &config).await,
        Command::Top => commands::top::run(transport, &config).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(&cli).await {
        tracing::error!("{} {e:#}", cli.command.prefix());
        return Err(e);
    }
    Ok(())
}
