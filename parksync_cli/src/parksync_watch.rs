use anyhow::Result;
use clap::Parser;

mod watch_logic;
use watch_logic::config::{self, Cli, Command};
use watch_logic::{inbox, logger, watch};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let settings = config::load_config_from(cli.config).resolve()?;
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch::run(settings).await,
        Command::Inbox(command) => inbox::run(&settings, command).await,
    }
}
