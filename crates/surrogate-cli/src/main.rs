//! Surrogate demo CLI
//!
//! Runs the traced database example against the typed or the dynamic
//! proxy layer, and lists what a proxy enumerates.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod database;
mod dynamic;

#[derive(Parser)]
#[command(name = "surrogate")]
#[command(about = "Delegating proxy demo", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run queries through a performance-traced database
    Trace {
        /// Queries to run (default: from config)
        queries: Vec<String>,
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Simulated latency per query, in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,
        /// Use the dynamic object model instead of #[delegatable] traits
        #[arg(long)]
        dynamic: bool,
    },

    /// List the members the tracer proxy enumerates
    Members {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Trace {
            queries,
            config,
            latency_ms,
            dynamic,
        } => commands::trace::execute(commands::trace::TraceOptions {
            config: config.as_deref(),
            latency_ms,
            queries,
            dynamic,
        }),
        Commands::Members { json } => commands::members::execute(json),
    }
}
