//! # Albumin CLI Module
//!
//! ## Available Commands
//!
//! - `analyze` - Report what a reconciliation pass would record
//! - `apply` - Run a reconciliation pass and record the updates
//! - `meta show` - Print the fields of one record
//! - `meta set` - Replace the values of one field
//! - `meta delete` - Remove one field

mod commands;

use crate::config::{AlbuminConfig, Overrides};
use albumin_core::AlbuminError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Albumin - capture dates for git-annex photo libraries
///
/// Collects capture-date evidence for photographs, keeps the most trusted
/// value per content key and records it as git-annex metadata.
#[derive(Parser, Debug)]
#[command(name = "albumin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "ALBUMIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the git-annex repository
    #[arg(short = 'R', long, global = true)]
    pub repo: Option<PathBuf>,

    /// Time zone for zoneless dates (IANA name, e.g. Europe/Istanbul)
    #[arg(short = 'z', long, global = true)]
    pub timezone: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the updates a pass would make, without writing them
    Analyze {
        /// Files or directories (walked recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Run a pass and record the updates
    Apply {
        /// Files or directories (walked recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Inspect or edit one metadata record
    Meta {
        #[command(subcommand)]
        action: MetaCommand,
    },
}

/// Record-level commands.
#[derive(Subcommand, Debug)]
pub enum MetaCommand {
    /// Print every field of a record
    Show {
        /// Content key
        key: String,
    },

    /// Make a field hold exactly the given values
    Set {
        /// Content key
        key: String,
        /// Field name
        field: String,
        /// New values
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove every value of a field
    Delete {
        /// Content key
        key: String,
        /// Field name
        field: String,
    },
}

impl Cli {
    /// Command-line layer of the configuration.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            repository: self.repo.clone(),
            timezone: self.timezone.clone(),
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AlbuminError> {
    let config = AlbuminConfig::load(&cli.overrides())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Analyze { paths } => cmd_reconcile(&config, &paths, false, json_mode),
        Commands::Apply { paths } => cmd_reconcile(&config, &paths, true, json_mode),
        Commands::Meta { action } => match action {
            MetaCommand::Show { key } => cmd_meta_show(&config, &key, json_mode),
            MetaCommand::Set { key, field, values } => {
                cmd_meta_set(&config, &key, &field, &values)
            }
            MetaCommand::Delete { key, field } => cmd_meta_delete(&config, &key, &field),
        },
    }
}
