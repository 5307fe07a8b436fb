//! elastico: search and display log lines stored in Elasticsearch.
//!
//! Entry point for the application. Parses CLI arguments, sets up
//! logging and delegates to the search handler.

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod core;
mod display;
mod error;

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::ElasticoError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let domain = e.downcast_ref::<ElasticoError>();
            if let Some(ElasticoError::BackendQueryFailure {
                response: Some(body),
                ..
            }) = domain
            {
                eprintln!("Backend response: {body}");
            }
            domain.map_or(ExitCode::FAILURE, |err| ExitCode::from(err.exit_code()))
        }
    }
}

/// Parse CLI arguments and run the search.
///
/// Returns instead of calling `process::exit` so that all destructors
/// (including `Zeroizing`) run.
fn run() -> Result<()> {
    if cli::is_manual_request(std::env::args_os()) {
        Cli::command().print_long_help()?;
        return Ok(());
    }

    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!(?cli, "parsed arguments");

    commands::search::execute(&cli)
}

/// Log to stderr. `-d` enables debug output for this crate; otherwise
/// `RUST_LOG` is honored, defaulting to warnings only.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("elastico=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
