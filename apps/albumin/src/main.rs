//! # Albumin - capture dates for git-annex photo libraries
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    apps/albumin (THE BINARY)                 │
//! │                                                              │
//! │  ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │    CLI      │   │    Config    │   │    Adapters      │   │
//! │  │   (clap)    │   │    (toml)    │   │ exiftool/calckey │   │
//! │  └──────┬──────┘   └──────┬───────┘   └────────┬─────────┘   │
//! │         └─────────────────┼────────────────────┘             │
//! │                           ▼                                  │
//! │                  ┌─────────────────┐                         │
//! │                  │  albumin-core   │◄──► git annex metadata  │
//! │                  │  (THE LOGIC)    │     --batch --json      │
//! │                  └─────────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! albumin --timezone Europe/Istanbul analyze photos/
//! albumin apply photos/2016/
//! albumin meta show SHA256E-s1234--abcd.jpg
//! albumin meta set SHA256E-s1234--abcd.jpg tag holiday beach
//! ```

use albumin::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // ALBUMIN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("ALBUMIN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "albumin=debug,albumin_core=debug"
    } else {
        "albumin=info,albumin_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

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
