// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! warung - conversational commerce bot for digital goods.
//!
//! Binary entry point.

mod catalog;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// warung - sell airtime, data, bills, and transfers over chat.
#[derive(Parser, Debug)]
#[command(name = "warung", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot: dialog engine, settlement webhook, and admin HTTP.
    Serve,
    /// Fetch the full product catalog and write it to a JSON file.
    Catalog {
        /// Output file path.
        #[arg(long, default_value = "products.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Catalog { out } => catalog::run(config, &out).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<warung_config::WarungConfig, warung_config::ConfigError> {
    match path {
        Some(path) => warung_config::load_config_from_path(path),
        None => warung_config::load_config(),
    }
}
