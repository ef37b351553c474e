//! # RuleHub CLI
//!
//! Command-line interface for a RuleHub library.
//!
//! ## Commands
//!
//! - `rulehub query [filter]` - List library items, filtered and sorted
//! - `rulehub use <path>` - Record one use of a library file
//! - `rulehub create <category> <name>` - Create a file
//! - `rulehub delete <category> <name>` - Delete a file
//! - `rulehub rename <category> <old> <new>` - Rename a file
//! - `rulehub status` - Show the library root and per-category counts
//! - `rulehub init` - Create the directory layout, optionally with starter files
//!
//! ## Example Usage
//!
//! ```bash
//! # Set up the library with bundled starter content
//! rulehub init --starter ./starter
//!
//! # Most used prompts mentioning "review"
//! rulehub query review -C prompt -s usageDesc
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use rulehub_core::SortMode;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// RuleHub - categorized rule and prompt library
#[derive(Parser)]
#[command(name = "rulehub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "RULEHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List library items
    #[command(alias = "q")]
    Query {
        /// Case-insensitive substring matched against "category/filename"
        filter: Option<String>,

        /// Only show one category
        #[arg(short = 'C', long)]
        category: Option<String>,

        /// Sort mode (nameAsc, nameDesc, catName, mtimeAsc, mtimeDesc, usageAsc, usageDesc)
        #[arg(short, long, default_value = "nameAsc")]
        sort: SortMode,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Record one use of a library file
    Use {
        /// Path of the file
        path: PathBuf,
    },

    /// Create a file in a category
    Create {
        category: String,

        /// Filename; the category's first extension is appended if missing
        name: String,

        /// Initial content
        #[arg(long, default_value = "")]
        content: String,
    },

    /// Delete a file from a category
    Delete { category: String, name: String },

    /// Rename a file within its category
    Rename {
        category: String,
        old_name: String,
        new_name: String,
    },

    /// Show the library root and per-category counts
    Status {
        /// Count only items matching this filter
        #[arg(short, long)]
        filter: Option<String>,

        /// Ignore the filter and count every item
        #[arg(long)]
        no_filter: bool,
    },

    /// Create the library directory layout
    Init {
        /// Copy starter files from this directory (one subdirectory per category)
        #[arg(long)]
        starter: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => rulehub_core::Config::load_from(path)?,
        None => rulehub_core::Config::load()?,
    };

    // Execute command
    match cli.command {
        Commands::Query {
            filter,
            category,
            sort,
            output,
        } => commands::query::run(config, filter.as_deref(), category.as_deref(), sort, output),
        Commands::Use { path } => commands::record::run(config, &path),
        Commands::Create {
            category,
            name,
            content,
        } => commands::create::run(config, &category, &name, &content),
        Commands::Delete { category, name } => commands::delete::run(config, &category, &name),
        Commands::Rename {
            category,
            old_name,
            new_name,
        } => commands::rename::run(config, &category, &old_name, &new_name),
        Commands::Status { filter, no_filter } => {
            commands::status::run(config, filter.as_deref(), no_filter)
        }
        Commands::Init { starter } => commands::init::run(config, starter.as_deref()),
    }
}
