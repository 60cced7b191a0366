// Copyright 2026 Convoca Contributors
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code, unused_imports)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod cli;
mod config;
mod error;
mod export;
mod fetcher;
mod normalize;
mod pipeline;
mod quality;
mod renderer;
mod stats;
mod store;
mod walker;

#[derive(Parser)]
#[command(
    name = "convoca",
    about = "Convoca — incremental collector and normalizer for SERVIR job postings",
    version,
    after_help = "Run 'convoca <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// SQLite store path (default: ~/.convoca/postings.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full collection pass against the portal
    Collect {
        /// Listing page index to start from
        #[arg(long, default_value = "0")]
        start_page: u32,
        /// Configuration file (lookup tables, retry policy)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Re-normalize stored postings without touching the network
    Reprocess {
        /// Configuration file (lookup tables, retry policy)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Export postings as CSV, optionally filtered by verdict
    Export {
        /// Verdict filter (e.g. "ACCEPTED"); omit for all rows
        #[arg(long)]
        verdict: Option<String>,
        /// Output file, or "-" for stdout
        #[arg(long, default_value = "-")]
        out: String,
    },
    /// Show stored-record count and verdict histogram
    Status,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = args.db.clone().unwrap_or_else(cli::default_db_path);

    let result = match args.command {
        Commands::Collect { start_page, config } => {
            cli::collect_cmd::run(
                config.as_deref(),
                &db_path,
                start_page,
                args.json,
                args.quiet,
            )
            .await
        }
        Commands::Reprocess { config } => {
            cli::reprocess_cmd::run(config.as_deref(), &db_path, args.json, args.quiet)
        }
        Commands::Export { verdict, out } => {
            cli::export_cmd::run(&db_path, verdict.as_deref(), &out, args.quiet)
        }
        Commands::Status => cli::status_cmd::run(&db_path, args.json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "convoca", &mut std::io::stdout());
            Ok(0)
        }
    };

    // Exit codes: 0 = complete, 2 = completed with partial failures,
    // 1 = aborted or fatal error.
    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}
