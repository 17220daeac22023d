//! Kino CLI - Headless player driver
//!
//! Features:
//! - Script runner for player commands (attr/css, fullscreen, playback)
//! - Event and watch-store transcripts
//! - `canPlayType` probing per box
//! - Video property table

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod script;

/// Kino CLI - Headless player toolkit
#[derive(Parser)]
#[command(name = "kino-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Drive a headless Kino player from scripts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a player script
    Run {
        /// Script file, one command per line
        script: PathBuf,

        /// Player configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Install a plugin that vetoes every fullscreen request
        #[arg(long)]
        veto_fullscreen: bool,
    },

    /// Ask a kernel which MIME types it can play
    Probe {
        /// MIME types, parameters allowed
        #[arg(required = true)]
        mimes: Vec<String>,

        /// Kernel box (native, flv, hls)
        #[arg(short, long = "box")]
        box_kind: Option<String>,
    },

    /// List video properties routed through the video config
    Properties,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so transcripts stay clean
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::Run { script, config, veto_fullscreen } => {
            commands::run(&script, config.as_deref(), veto_fullscreen, format).await?;
        }
        Commands::Probe { mimes, box_kind } => {
            commands::probe(&mimes, box_kind.as_deref(), format)?;
        }
        Commands::Properties => {
            commands::properties(format);
        }
    }

    Ok(())
}
