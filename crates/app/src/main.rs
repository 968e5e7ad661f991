//! Heroes - volunteering events platform
//!
//! Command-line front end over the local event catalogue.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod state;

use commands::{Cli, Command};
use config::AppConfig;
use error::AppResult;

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(&config, &cli.command) {
        tracing::error!("Command failed: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(config: &AppConfig, command: &Command) -> AppResult<()> {
    let app_state = state::AppState::new(config)?;
    tracing::info!(command = command.name(), "Starting Heroes");

    let output = command.run(&app_state.db)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
