//! spatia CLI - drive the spatial audio engine from the command line.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spatia")]
#[command(author, version, about = "Spatial audio engine CLI", long_about = None)]
struct Cli {
    /// Engine config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file through the engine
    Process(commands::process::ProcessArgs),

    /// Play through the low-latency preview path
    Preview(commands::preview::PreviewArgs),

    /// List output devices
    Devices,

    /// Replay recorded rotation-vector readings through the head tracker
    Yaw(commands::yaw::YawArgs),

    /// Create, show or locate the engine config
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => commands::process::run(args, config),
        Commands::Preview(args) => commands::preview::run(args, config),
        Commands::Devices => commands::devices::run(),
        Commands::Yaw(args) => commands::yaw::run(args, config),
        Commands::Config(args) => commands::config::run(args, config),
    }
}
