use anyhow::{Context, Result};
use clap::Subcommand;
use ocrd_utils::log_config::{HandlerClass, LogConfig, discover_log_config};
use std::{path::PathBuf, process::ExitCode};

#[derive(Subcommand, Debug)]
pub enum LogConfigCommand {
    /// Check a logging configuration file (default: the one in effect).
    Check { file: Option<PathBuf> },

    /// Show the logging configuration in effect and the resulting filter.
    Show,
}

pub fn run(command: LogConfigCommand) -> Result<ExitCode> {
    match command {
        LogConfigCommand::Check { file } => {
            let Some(path) = file.or_else(discover_log_config) else {
                println!("No logging configuration found, using built-in default");
                return Ok(ExitCode::SUCCESS);
            };
            let config = LogConfig::load(&path)
                .with_context(|| format!("Invalid logging configuration {}", path.display()))?;
            let problems = problems(&config);
            for problem in &problems {
                println!("{}: {problem}", path.display());
            }
            for handler in config.unused_handlers() {
                println!("{}: handler '{handler}' is not used by any logger", path.display());
            }
            if !problems.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
            println!("{}: OK", path.display());
        }
        LogConfigCommand::Show => {
            let (origin, config) = match discover_log_config() {
                Some(path) => {
                    let config = LogConfig::load(&path).with_context(|| {
                        format!("Invalid logging configuration {}", path.display())
                    })?;
                    (path.display().to_string(), config)
                }
                None => ("built-in default".to_string(), LogConfig::default_config()),
            };
            println!("# {origin}");
            println!("# filter: {}", config.filter_directives(None));
            print!("{config}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Handlers that would fail when logging is set up.
fn problems(config: &LogConfig) -> Vec<String> {
    config
        .handlers
        .iter()
        .filter_map(|h| match &h.class {
            HandlerClass::Other(class) => {
                Some(format!("handler '{}' uses unsupported class '{class}'", h.name))
            }
            _ => None,
        })
        .collect()
}
