// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wicket - embeddable customer-support chat with AI-to-human handoff.
//!
//! Binary entry point: loads and validates configuration, then dispatches
//! to the serve loop or the one-shot maintenance commands.

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Wicket - embeddable customer-support chat with AI-to-human handoff.
#[derive(Parser, Debug)]
#[command(name = "wicket", version, about, long_about = None)]
struct Cli {
    /// Path to a wicket.toml, bypassing the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Wicket gateway and background sweeper.
    Serve,
    /// Run a single sweep pass and exit.
    Sweep,
    /// Load and validate configuration, then exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => wicket_config::load_and_validate_path(path),
        None => wicket_config::load_and_validate(),
    };
    let config = match config {
        Ok(config) => config,
        Err(errors) => {
            wicket_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run_serve(config).await,
        Some(Commands::Sweep) => serve::run_sweep_once(config).await,
        Some(Commands::Config) => {
            println!(
                "config OK (service.name={}, gateway={}:{})",
                config.service.name, config.gateway.host, config.gateway.port
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
