//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod browse;
pub mod config;
pub mod resolve;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Resolve listing locations against the administrative hierarchy
#[derive(Parser)]
#[command(name = "listing-locator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log progress to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List countries
    Countries,

    /// List the regions of a country
    Regions(browse::RegionsArgs),

    /// List the communities of a region
    Communities(browse::CommunitiesArgs),

    /// List or search the settlements of a community
    Settlements(browse::SettlementsArgs),

    /// Resolve a point into a full listing location
    Resolve(resolve::ResolveArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Countries => browse::countries().await,
        Commands::Regions(args) => browse::regions(args).await,
        Commands::Communities(args) => browse::communities(args).await,
        Commands::Settlements(args) => browse::settlements(args).await,
        Commands::Resolve(args) => resolve::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}

/// `RUST_LOG` wins; otherwise warnings, or info with `--verbose`
fn init_logging(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}
