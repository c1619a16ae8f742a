//! # `ocrd`
//!
//! Entry point of the OCR-D command line tool.
//!
//! ## Subcommands
//!
//! - **`workspace`**: create, clone, inspect, edit and validate workspaces.
//! - **`zip`**: bag workspaces as OCRD-ZIP, spill bags, validate bags.
//! - **`log-config`**: check and show the logging configuration.
//!
//! Without a subcommand, usage is printed and the exit code is 0.
//!
//! ## Configuration
//!
//! Logging follows `ocrd_logging.conf` (see `ocrd_utils::log_config`);
//! `--log-level` overrides all levels. Resolver and validation defaults come
//! from `ocrd.toml` or `--config`.

mod log_config_cmd;
mod workspace_cmd;
mod zip_cmd;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use ocrd::OcrdConfig;
use ocrd_utils::{
    init_logging,
    log_config::{LogConfig, LogLevel},
    logging::{flush_logging, init_logging_with},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::debug;

/// Tools for OCR-D workspaces, OCRD-ZIP bags and logging configuration.
#[derive(Parser, Debug)]
#[command(name = "ocrd", author, version, about)]
struct Cli {
    /// Override all log levels (CRITICAL, ERROR, WARNING, INFO, DEBUG, NOTSET).
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Configuration file. Defaults to ./ocrd.toml, then the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work with OCR-D workspaces.
    Workspace(workspace_cmd::WorkspaceArgs),

    /// Bag, spill and validate OCRD-ZIP.
    #[command(subcommand)]
    Zip(zip_cmd::ZipCommand),

    /// Check and show the logging configuration.
    #[command(subcommand)]
    LogConfig(log_config_cmd::LogConfigCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let code = match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ocrd fatal error: {e:#}");
            ExitCode::FAILURE
        }
    };
    flush_logging();
    code
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    match &command {
        // A broken logging config must not keep us from reporting on it.
        Command::LogConfig(_) => {
            let level = cli
                .log_level
                .as_deref()
                .map(str::parse::<LogLevel>)
                .transpose()
                .map_err(|v| anyhow::anyhow!("Invalid log level '{v}'"))?;
            init_logging_with(&LogConfig::default_config(), level)?;
        }
        _ => init_logging(cli.log_level.as_deref())?,
    }

    let config = match &cli.config {
        Some(path) => OcrdConfig::load(path)
            .with_context(|| format!("Loading configuration {}", path.display()))?,
        None => OcrdConfig::discover()?,
    };
    debug!("Configuration: {config:?}");

    match command {
        Command::Workspace(args) => workspace_cmd::run(args, &config).await,
        Command::Zip(cmd) => zip_cmd::run(cmd, &config).await,
        Command::LogConfig(cmd) => log_config_cmd::run(cmd),
    }
}
