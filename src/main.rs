use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod cli;

use cli::{
    cmd_locate, cmd_match, cmd_profiles, cmd_watch, init_logging, load_config, open_catalog,
    LocateArgs, MatchArgs, OutputFormat, ProfilesArgs, WatchArgs,
};

/// Dockwright - locate, dock and self-heal an injected control
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    output: OutputFormat,

    /// Profile store directory (overrides the configured one)
    #[arg(long, value_name = "DIR", global = true)]
    store: Option<PathBuf>,

    /// Serve profiles from this file instead of the store
    #[arg(long, value_name = "FILE", global = true)]
    profiles: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the loaded profiles
    Profiles(ProfilesArgs),

    /// Show which profile a URL resolves to
    Match(MatchArgs),

    /// Locate the input of a page fixture
    Locate(LocateArgs),

    /// Run the lifecycle watcher against a page fixture
    Watch(WatchArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting Dockwright v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;
    let catalog = Arc::new(open_catalog(
        &config,
        cli.store.as_deref(),
        cli.profiles.as_deref(),
    )?);

    let result = match cli.command {
        Commands::Profiles(args) => cmd_profiles(args, &catalog, cli.output),
        Commands::Match(args) => cmd_match(args, &catalog, cli.output),
        Commands::Locate(args) => cmd_locate(args, &config, &catalog, cli.output),
        Commands::Watch(args) => cmd_watch(args, &config, Arc::clone(&catalog), cli.output).await,
    };

    if let Err(err) = &result {
        error!("Command failed: {err:#}");
    }
    result
}
