//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{check, classify_cmd, models, scan};
use crate::domain::SourceSite;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "jbscrape")]
#[command(author, version, about = "Find used iPhones still running a jailbreakable iOS version")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration file
    #[arg(long, global = true, env = "JBSCRAPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Defaults to `scan`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search marketplaces, classify listings and write a report
    Scan(ScanArgs),

    /// Classify listings from a JSON file without touching the network
    Classify(ClassifyArgs),

    /// Check whether a model can run a jailbreakable iOS version
    Check {
        /// Model name, e.g. "iPhone 13 Pro"
        model: String,

        /// iOS version, e.g. 16.5 or "iOS 16.1.2"
        #[arg(value_name = "VERSION")]
        ios_version: String,
    },

    /// Print the compatibility table
    Models,
}

/// Flags for `jbscrape scan`; unset values fall back to the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Sites to search
    #[arg(long, value_enum, num_args = 1..)]
    pub sites: Vec<SourceSite>,

    /// Result pages per eBay query
    #[arg(long)]
    pub pages: Option<u32>,

    /// Seconds to wait between requests
    #[arg(long)]
    pub delay: Option<f64>,

    /// Listings visited per Swappa model
    #[arg(long)]
    pub max_listings_per_model: Option<usize>,

    /// Drop listings priced above this amount (unpriced listings are kept)
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Report file path
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Publish a note summarizing the results
    #[arg(long)]
    pub note: bool,

    /// Replace an earlier note with the same title
    #[arg(long, requires = "note")]
    pub overwrite_note: bool,

    /// Prompt for sites and note options
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// JSON file of listings, or - for stdin
    pub input: PathBuf,

    /// Report file path
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Drop listings priced above this amount (unpriced listings are kept)
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Publish a note summarizing the results
    #[arg(long)]
    pub note: bool,

    /// Replace an earlier note with the same title
    #[arg(long, requires = "note")]
    pub overwrite_note: bool,
}

/// Logs go to stderr: `warn` by default, crate `debug` with `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,jbscrape=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // a subscriber may already be installed when running under tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.format);

    tracing::debug!(config = ?cli.config, "jbscrape starting");

    match cli.command.unwrap_or_else(|| Commands::Scan(ScanArgs::default())) {
        Commands::Scan(args) => {
            let config = Config::load(cli.config.as_deref())?;
            scan::run(&output, config, args)?
        }
        Commands::Classify(args) => {
            let config = Config::load(cli.config.as_deref())?;
            classify_cmd::run(&output, config, args)?
        }
        Commands::Check { model, ios_version } => check::run(&output, &model, &ios_version)?,
        Commands::Models => models::run(&output)?,
    }

    Ok(())
}
