//! widerow - command-line reader for wide-column tables
//!
//! Streams rows from a server, or replays a captured chunk stream offline.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use widerow_client::ClientConfig;

#[derive(Parser)]
#[command(name = "widerow")]
#[command(about = "Read rows from a widerow table")]
#[command(version)]
pub struct Cli {
    /// YAML config file
    #[arg(short, long, env = "WIDEROW_CONFIG")]
    config: Option<PathBuf>,

    /// Server address (overrides config)
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// Project (overrides config)
    #[arg(long)]
    project: Option<String>,

    /// Instance (overrides config)
    #[arg(long)]
    instance: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream rows from a table
    ReadRows {
        /// Table ID
        table: String,

        /// First row key, inclusive
        #[arg(long)]
        start: Option<String>,

        /// Last row key, exclusive
        #[arg(long)]
        end: Option<String>,

        /// Only rows whose key starts with this prefix
        #[arg(long, conflicts_with_all = ["start", "end"])]
        prefix: Option<String>,

        /// Maximum rows to return
        #[arg(short, long)]
        limit: Option<u64>,

        /// Only the latest N versions of each column
        #[arg(long)]
        latest: Option<u32>,

        /// Only families matching this regex
        #[arg(short, long)]
        family: Option<String>,
    },

    /// Read a single row
    ReadRow {
        /// Table ID
        table: String,

        /// Row key
        key: String,

        /// Only the latest N versions of each column
        #[arg(long)]
        latest: Option<u32>,

        /// Only families matching this regex
        #[arg(short, long)]
        family: Option<String>,
    },

    /// Replay a captured chunk stream (one JSON chunk per line)
    ParseChunks {
        /// Path to the .jsonl file
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path).map_err(|e| {
            eprintln!("{}: {}", "Config error".red(), e);
            e
        })?,
        None => ClientConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(addr) = cli.addr {
        config.endpoint.addr = addr;
    }
    if let Some(project) = cli.project {
        config.table.project = project;
    }
    if let Some(instance) = cli.instance {
        config.table.instance = instance;
    }
    tracing::debug!(addr = %config.endpoint.addr, "configuration loaded");

    match commands::execute(&config, cli.command).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
