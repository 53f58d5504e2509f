//! Omniplay CLI - drive the provider adapters without a browser
//!
//! Features:
//! - Scripted playback session against the simulated backend
//! - Generic/native event tables per backend
//! - Backend SDK asset listing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Omniplay CLI - embedded video adapter toolkit
#[derive(Parser)]
#[command(name = "omniplay")]
#[command(version)]
#[command(about = "Drive embedded video backends through one command surface", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session on the simulated backend and print its events
    Demo {
        /// Video id of the simulated clip
        #[arg(long, default_value = "demo")]
        video_id: String,

        /// Clip duration in seconds
        #[arg(short, long, default_value = "20")]
        duration: f64,
    },

    /// Show the generic to native event table of a backend
    Events {
        /// Backend name (youtube, vimeo, dailymotion, flowplayer, iframe, test)
        provider: String,
    },

    /// List supported backends and their SDK assets
    Providers,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    omniplay_core::init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo { video_id, duration } => {
            commands::demo(config, &video_id, duration, &cli.format).await?;
        }
        Commands::Events { provider } => {
            commands::events(&provider, &cli.format)?;
        }
        Commands::Providers => {
            commands::providers(&config, &cli.format)?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
