//! # Logging Initialization
//!
//! Sets up the process-wide `tracing` subscriber from a logging configuration
//! file (see [`crate::log_config`]).
//!
//! ## Core Functionality
//!
//! - **`init_logging()`**: called once at the start of the program. A
//!   `std::sync::Once` makes repeated calls no-ops.
//! - **`flush_logging()`**: called once at the end; drains the file writers.
//!
//! ## Configuration
//!
//! 1. **Config file**: `ocrd_logging.conf` is searched in the working directory,
//!    the home directory and `/etc`. Without one, the built-in default logs
//!    INFO and above to stderr.
//! 2. **Handlers**: every handler a logger refers to becomes one
//!    `tracing_subscriber::fmt` layer, with a per-layer filter that encodes
//!    which logger names reach that handler and at which level. File handlers
//!    write through `tracing_appender`'s non-blocking writer.
//! 3. **Formatting**: layers render events with [`PythonStyleFormat`], so the
//!    formatter's `format`/`datefmt` strings work unchanged.
//! 4. **Overrides**: an explicit level (`--log-level`) replaces every
//!    configured level; `RUST_LOG` takes over level filtering entirely while
//!    handler routing stays as configured.

mod format;

pub use format::{LogRecord, PythonStyleFormat, level_name};

use crate::log_config::{
    HandlerClass, HandlerRoute, LogConfig, LogConfigError, LogLevel, Rotation, discover_log_config,
};
use anyhow::{Context, Result, anyhow};
use std::{
    io::{stderr, stdout},
    path::Path,
    sync::{Mutex, Once},
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::Targets,
    fmt,
    prelude::*,
};

static INIT: Once = Once::new();

/// Workers of non-blocking file writers, flushed by [`flush_logging`].
static GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize verbose logging for tests: everything to stderr.
pub fn init_test_logging() {
    let _ = init_logging_with(&LogConfig::default_config(), Some(LogLevel::NotSet));
}

/// Initializes logging from the discovered configuration file.
///
/// `override_level` (e.g. `"DEBUG"`) replaces all configured levels.
///
/// # Errors
///
/// Returns an error for an unknown level name, an invalid configuration file,
/// or a handler that cannot be set up.
pub fn init_logging(override_level: Option<&str>) -> Result<()> {
    let override_level = override_level
        .map(|l| {
            l.parse::<LogLevel>()
                .map_err(|v| anyhow!("Invalid log level '{v}'"))
        })
        .transpose()?;
    let config = match discover_log_config() {
        Some(path) => LogConfig::load(&path)
            .with_context(|| format!("Loading logging configuration {}", path.display()))?,
        None => LogConfig::default_config(),
    };
    init_logging_with(&config, override_level)
}

/// Initializes logging from an explicit configuration. Only the first call
/// in a process has an effect.
pub fn init_logging_with(config: &LogConfig, override_level: Option<LogLevel>) -> Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = install(config, override_level);
    });
    result
}

/// Writes out everything buffered for file handlers. Call before the
/// process exits; later events to file handlers are dropped.
pub fn flush_logging() {
    if let Ok(mut guards) = GUARDS.lock() {
        guards.clear();
    }
}

fn install(config: &LogConfig, override_level: Option<LogLevel>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().ok();
    // With RUST_LOG in charge, handler layers only route; they don't filter by level.
    let routing_level = if env_filter.is_some() {
        Some(LogLevel::NotSet)
    } else {
        override_level
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    for route in config.routes(routing_level) {
        if let Some(layer) = handler_layer(&route)? {
            layers.push(layer);
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logging subscriber: {e}"))
}

fn route_filter(route: &HandlerRoute<'_>) -> Targets {
    Targets::new()
        .with_default(route.default)
        .with_targets(route.targets.iter().cloned())
}

fn handler_layer(route: &HandlerRoute<'_>) -> Result<Option<BoxedLayer>> {
    let format = PythonStyleFormat::from_formatter(route.formatter);
    let filter = route_filter(route);
    let layer = match &route.handler.class {
        HandlerClass::Stderr => fmt::layer()
            .event_format(format)
            .with_ansi(false)
            .with_writer(stderr)
            .with_filter(filter)
            .boxed(),
        HandlerClass::Stdout => fmt::layer()
            .event_format(format)
            .with_ansi(false)
            .with_writer(stdout)
            .with_filter(filter)
            .boxed(),
        HandlerClass::File { path, truncate } => {
            if *truncate {
                std::fs::File::create(path)
                    .with_context(|| format!("Truncating log file {}", path.display()))?;
            }
            let appender = file_appender(path, rolling::Rotation::NEVER)?;
            non_blocking_layer(appender, format, filter)
        }
        HandlerClass::RollingFile { path, rotation } => {
            let rotation = match rotation {
                Rotation::Minutely => rolling::Rotation::MINUTELY,
                Rotation::Hourly => rolling::Rotation::HOURLY,
                Rotation::Daily => rolling::Rotation::DAILY,
            };
            let appender = file_appender(path, rotation)?;
            non_blocking_layer(appender, format, filter)
        }
        HandlerClass::Null => return Ok(None),
        HandlerClass::Other(class) => {
            return Err(LogConfigError::UnsupportedHandler {
                name: route.handler.name.clone(),
                class: class.clone(),
            }
            .into());
        }
    };
    Ok(Some(layer))
}

fn file_appender(path: &Path, rotation: rolling::Rotation) -> Result<RollingFileAppender> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("Opening log file {}", path.display()))
}

fn non_blocking_layer(
    appender: RollingFileAppender,
    format: PythonStyleFormat,
    filter: Targets,
) -> BoxedLayer {
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if let Ok(mut guards) = GUARDS.lock() {
        guards.push(guard);
    }
    fmt::layer()
        .event_format(format)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_route_filter_levels() {
        let config = LogConfig::parse(
            "[loggers]\nkeys=root,res\n[handlers]\nkeys=h\n[formatters]\nkeys=\n\
             [logger_root]\nlevel=WARNING\nhandlers=h\n\
             [logger_res]\nlevel=DEBUG\nhandlers=\nqualname=ocrd.resolver\n\
             [handler_h]\nclass=StreamHandler\nargs=(sys.stderr,)\n",
        )
        .unwrap();
        let routes = config.routes(None);
        let filter = route_filter(&routes[0]);
        assert!(filter.would_enable("ocrd::resolver", &Level::DEBUG));
        assert!(!filter.would_enable("ocrd::workspace", &Level::INFO));
        assert!(filter.would_enable("ocrd::workspace", &Level::WARN));
    }

    #[test]
    fn test_unsupported_handler_is_rejected() {
        let config = LogConfig::parse(
            "[loggers]\nkeys=root\n[handlers]\nkeys=s\n[formatters]\nkeys=\n\
             [logger_root]\nhandlers=s\n[handler_s]\nclass=handlers.SysLogHandler\n",
        )
        .unwrap();
        let routes = config.routes(None);
        let err = handler_layer(&routes[0]).err().unwrap();
        assert!(err.to_string().contains("unsupported class"));
    }

    #[test]
    fn test_null_handler_has_no_layer() {
        let config = LogConfig::parse(
            "[loggers]\nkeys=root\n[handlers]\nkeys=n\n[formatters]\nkeys=\n\
             [logger_root]\nhandlers=n\n[handler_n]\nclass=NullHandler\n",
        )
        .unwrap();
        let routes = config.routes(None);
        assert!(handler_layer(&routes[0]).unwrap().is_none());
    }
}
