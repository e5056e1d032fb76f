use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raw_linker::Config;

mod commands;

#[derive(Parser)]
#[command(name = "raw-linker")]
#[command(about = "Find the sidecars and rendered images that belong to your RAW photos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the per-user config if present)
    #[arg(long, global = true, env = "RAW_LINKER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory containing RAW files and sidecars
    #[arg(short = 'i', long = "in", global = true)]
    sources: Option<PathBuf>,

    /// Directory containing rendered outputs
    #[arg(short = 'o', long = "out", global = true)]
    outputs: Option<PathBuf>,

    /// RAW extension to look for (repeatable)
    #[arg(short = 'e', long = "extension", global = true)]
    extensions: Vec<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every RAW with its sidecars and outputs
    List {
        /// Only look up this RAW or sidecar
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Show where each output should be rendered
    Plan {
        /// Only outputs that do not exist yet
        #[arg(short, long)]
        new: bool,
    },

    /// Find RAWs and sidecars with nothing rendered from them
    Clean {
        /// Move candidates into the staging directory
        #[arg(short, long, conflicts_with = "delete")]
        stage: bool,

        /// Delete candidates
        #[arg(short, long)]
        delete: bool,

        /// Also include outputs whose RAW is gone
        #[arg(long)]
        orphans: bool,

        /// Report what would happen without touching any file
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    info!("Starting raw-linker v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    match cli.command {
        Commands::List { path } => commands::list::execute(&config, path),
        Commands::Plan { new } => commands::plan::execute(&config, new),
        Commands::Clean {
            stage,
            delete,
            orphans,
            dry_run,
        } => commands::clean::execute(&config, commands::clean::Options {
            stage,
            delete,
            orphans,
            dry_run,
        }),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(sources) = &cli.sources {
        config.sources_dir = sources.clone();
    }
    if let Some(outputs) = &cli.outputs {
        config.outputs_dir = outputs.clone();
    }
    if !cli.extensions.is_empty() {
        config.raw_extensions = cli.extensions.clone();
    }

    let config = config.normalized().context("Invalid configuration")?;
    tracing::debug!(
        "Sources {} / outputs {} / raw extensions {:?}",
        config.sources_dir.display(),
        config.outputs_dir.display(),
        config.raw_extensions
    );
    Ok(config)
}
