//! # SCAD Dataset CLI
//!
//! Command-line interface for building the OpenSCAD dataset: brainstorming
//! and filtering candidate lists, running the resumable generation pipeline,
//! and merging all category stores into the combined dataset.
//!
//! The process always exits with status 0. Failures are printed, and
//! per-subject failures are recorded in the store.

mod cli;

use clap::{Args, Parser, Subcommand};
use scad_dataset::logging::init_tracing;
use scad_dataset::prompts::{Complexity, Style};
use scad_dataset::{DatasetConfig, DatasetError};
use std::path::PathBuf;
use tracing::{error, info};

use cli::{
    handle_brainstorm_command, handle_categories_command, handle_filter_command,
    handle_generate_command, handle_merge_command,
};

#[derive(Parser, Debug)]
#[command(name = "scad-dataset")]
#[command(about = "Generate, validate, and merge an LLM-written OpenSCAD dataset")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file path (default: ./scad-dataset.toml or ./config/scad-dataset.toml)
    #[arg(short, long, env = "SCAD_DATASET_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate OpenSCAD models for one subject or a whole name list
    Generate(GenerateArgs),

    /// Brainstorm a candidate name list for a category
    Brainstorm(BrainstormArgs),

    /// Keep only the names the model classifies as members of the category
    Filter(FilterArgs),

    /// Combine every category store into one dataset file
    Merge(MergeArgs),

    /// List the configured categories and their store status
    Categories,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Category name (see `scad-dataset categories`)
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Generate a single subject, replacing any existing record for it
    #[arg(value_name = "SUBJECT")]
    pub subject: Option<String>,

    /// Process every name in the category's list file
    #[arg(long)]
    pub list: bool,

    /// Maximum number of list entries to consider (default: all)
    #[arg(long, value_name = "N")]
    pub max: Option<usize>,

    /// Model style (default from configuration)
    #[arg(long, value_enum)]
    pub style: Option<Style>,

    /// Model complexity (default from configuration)
    #[arg(long, value_enum)]
    pub complexity: Option<Complexity>,

    /// Store file (default: the category's dataset file)
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<PathBuf>,

    /// Name list file (default: the category's list file)
    #[arg(long, value_name = "PATH")]
    pub list_file: Option<PathBuf>,

    /// Process subjects whose recorded attempt failed again
    #[arg(long)]
    pub retry_failed: bool,
}

#[derive(Debug, Args)]
pub struct BrainstormArgs {
    /// Category name
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Number of names to collect (default: the category's target count)
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,

    /// Output list file (default: the category's list file)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Category name
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Input list file (default: the category's list file)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output list file (default: filtered_list.json next to the list file)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Combined output file (default from configuration)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Re-run the quick renderer check and drop records that fail it
    #[arg(long)]
    pub revalidate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = match DatasetConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            println!("✗ Failed to load configuration: {e}");
            return Ok(());
        }
    };

    info!(
        model = %config.generation.model,
        data_dir = %config.pipeline.data_dir.display(),
        categories = config.categories.len(),
        "scad-dataset starting"
    );

    let result = match cli.command {
        Commands::Generate(args) => handle_generate_command(args, &config).await,
        Commands::Brainstorm(args) => handle_brainstorm_command(args, &config).await,
        Commands::Filter(args) => handle_filter_command(args, &config).await,
        Commands::Merge(args) => handle_merge_command(args, &config).await,
        Commands::Categories => handle_categories_command(&config),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        match e.downcast_ref::<DatasetError>() {
            Some(dataset_error) if dataset_error.is_precondition() => {
                println!("✗ Nothing was processed: {e:#}");
            }
            _ => println!("✗ {e:#}"),
        }
    }

    Ok(())
}
