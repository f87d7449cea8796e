//! # Roamdown - Roam Research to Markdown
//!
//! The main binary for roamdown.
//!
//! This application:
//! - Reads a Datascript EDN export of a Roam Research graph
//! - Finds blocks tagged with the publish tag
//! - Writes each one as `post_<uid>.md`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 apps/roamdown (THE BINARY)              │
//! │                                                         │
//! │   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   │
//! │   │    CLI      │   │   Config    │   │  File I/O   │   │
//! │   │   (clap)    │   │   (toml)    │   │  + tracing  │   │
//! │   └──────┬──────┘   └──────┬──────┘   └──────┬──────┘   │
//! │          └─────────────────┼─────────────────┘          │
//! │                            ▼                            │
//! │                   ┌─────────────────┐                   │
//! │                   │  roamdown-core  │                   │
//! │                   │   (THE LOGIC)   │                   │
//! │                   └─────────────────┘                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Publish every post tagged #publish into ./output
//! roamdown -i export.edn publish
//!
//! # Snapshot statistics
//! roamdown -i export.edn status --json-mode
//!
//! # Print one block as Markdown
//! roamdown -i export.edn render --uid abc123
//! ```

use clap::Parser;
use roamdown::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Initialize tracing: ROAMDOWN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("ROAMDOWN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "roamdown=debug"
    } else {
        "roamdown=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // stdout is reserved for documents and JSON.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
