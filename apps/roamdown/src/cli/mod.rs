//! # Roamdown CLI Module
//!
//! This module implements the CLI interface for roamdown.
//!
//! ## Available Commands
//!
//! - `publish` - Write every tagged post to the output directory (default)
//! - `status` - Show snapshot and graph statistics
//! - `render` - Print the document of one block

mod commands;

use crate::config::{Overrides, Settings};
use clap::{Parser, Subcommand};
use roamdown_core::RoamError;
use std::path::{Path, PathBuf};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Roamdown - publish Roam Research blocks as Markdown
///
/// Reads a Datascript EDN export and writes one Markdown file per block
/// tagged with the publish tag.
#[derive(Parser, Debug)]
#[command(name = "roamdown")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the EDN export
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// Path to a TOML config file (default: ./roamdown.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write every tagged post as Markdown
    Publish {
        /// Tag (page title) that selects posts
        #[arg(short = 't', long)]
        publish_tag: Option<String>,

        /// Existing directory to write posts into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort on the first post that fails
        #[arg(long)]
        fail_fast: bool,
    },

    /// Show snapshot and graph statistics
    Status,

    /// Render one block by uid to stdout
    Render {
        /// Uid of the root block
        #[arg(short, long)]
        uid: String,

        /// Tag whose marker is stripped from the title
        #[arg(short = 't', long)]
        publish_tag: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), RoamError> {
    let json_mode = cli.json_mode;
    let mut overrides = Overrides {
        input: cli.input,
        ..Overrides::default()
    };

    let command = cli.command.unwrap_or(Commands::Publish {
        publish_tag: None,
        output: None,
        fail_fast: false,
    });

    match command {
        Commands::Publish {
            publish_tag,
            output,
            fail_fast,
        } => {
            overrides.publish_tag = publish_tag;
            overrides.output_dir = output;
            overrides.fail_fast = fail_fast;
            let settings = resolve_settings(cli.config.as_deref(), overrides)?;
            cmd_publish(&settings, json_mode)
        }
        Commands::Status => {
            let settings = resolve_settings(cli.config.as_deref(), overrides)?;
            cmd_status(&settings, json_mode)
        }
        Commands::Render { uid, publish_tag } => {
            overrides.publish_tag = publish_tag;
            let settings = resolve_settings(cli.config.as_deref(), overrides)?;
            cmd_render(&settings, &uid, json_mode)
        }
    }
}

/// Merge the config file layer with command-line overrides.
fn resolve_settings(config: Option<&Path>, overrides: Overrides) -> Result<Settings, RoamError> {
    let settings = Settings::discover(config, Path::new("."))?.with_overrides(overrides);
    tracing::debug!(?settings, "Resolved settings");
    Ok(settings)
}
