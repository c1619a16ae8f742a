//! # Logging Configuration Files
//!
//! Parses and checks `ocrd_logging.conf`, an INI file in the classic
//! loggers/handlers/formatters layout:
//!
//! ```ini
//! [loggers]
//! keys=root,ocrd_resolver
//!
//! [handlers]
//! keys=consoleHandler
//!
//! [formatters]
//! keys=defaultFormatter
//!
//! [logger_root]
//! level=INFO
//! handlers=consoleHandler
//!
//! [logger_ocrd_resolver]
//! level=DEBUG
//! handlers=
//! qualname=ocrd.resolver
//!
//! [handler_consoleHandler]
//! class=StreamHandler
//! formatter=defaultFormatter
//! args=(sys.stderr,)
//!
//! [formatter_defaultFormatter]
//! format=%(asctime)s.%(msecs)03d %(levelname)s %(name)s - %(message)s
//! datefmt=%H:%M:%S
//! ```
//!
//! Every name listed under `keys=` must have its own `logger_*`, `handler_*`
//! or `formatter_*` section, and every handler or formatter a section refers
//! to must be declared. Violations are reported as [`LogConfigError`].
//!
//! The file is looked up in the current directory, then the home directory,
//! then `/etc`. The first match wins; without any file
//! [`LogConfig::default_config`] applies.
//!
//! Logger names are dotted (`ocrd.resolver`); they map onto tracing targets
//! by replacing `.` with `::` (`ocrd::resolver`).

use crate::constants::{LOG_CONFIG_FILENAME, SYSTEM_CONFIG_DIR};
use chrono::format::{Item, StrftimeItems};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

/// Errors raised while reading or checking a logging configuration.
#[derive(Debug, Error)]
pub enum LogConfigError {
    #[error("Failed to read logging config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Duplicate section [{0}]")]
    DuplicateSection(String),

    #[error("Missing section [{0}]")]
    MissingSection(String),

    #[error("Section [{section}] has no '{key}' key")]
    MissingKey { section: String, key: String },

    #[error("Section [{section}] refers to {kind} '{name}' which is not declared in [{kind}s]")]
    UndeclaredReference {
        section: String,
        kind: &'static str,
        name: String,
    },

    #[error("Section [{section}] has invalid level '{value}'")]
    InvalidLevel { section: String, value: String },

    #[error("Section [{section}] has datefmt '{datefmt}' that cannot be rendered")]
    InvalidDatefmt { section: String, datefmt: String },

    #[error("Handler '{name}' uses unsupported class '{class}'")]
    UnsupportedHandler { name: String, class: String },
}

/// Log levels as spelled in logging configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    NotSet,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::NotSet => "NOTSET",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Closest tracing level. tracing has no CRITICAL, so it collapses onto ERROR.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::NotSet => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOTSET" | "TRACE" => Ok(LogLevel::NotSet),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerSection {
    pub name: String,
    pub level: Option<LogLevel>,
    pub handlers: Vec<String>,
    pub qualname: Option<String>,
    pub propagate: bool,
}

impl LoggerSection {
    pub fn is_root(&self) -> bool {
        self.name == "root"
    }

    /// Dotted logger name, falling back to the section name.
    pub fn logger_name(&self) -> &str {
        self.qualname.as_deref().unwrap_or(&self.name)
    }

    /// tracing target this logger governs.
    pub fn target(&self) -> String {
        self.logger_name().replace('.', "::")
    }
}

/// Time-based rotation intervals for rolling file handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

/// Where a handler sends records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerClass {
    Stderr,
    Stdout,
    File { path: PathBuf, truncate: bool },
    RollingFile { path: PathBuf, rotation: Rotation },
    Null,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSection {
    pub name: String,
    pub class: HandlerClass,
    pub class_name: String,
    pub level: Option<LogLevel>,
    pub formatter: Option<String>,
    pub args: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSection {
    pub name: String,
    pub format: Option<String>,
    pub datefmt: Option<String>,
}

/// Format used when a handler has no formatter or the formatter has no `format`.
pub const DEFAULT_FORMAT: &str = "%(asctime)s.%(msecs)03d %(levelname)s %(name)s - %(message)s";
/// Date format paired with [`DEFAULT_FORMAT`].
pub const DEFAULT_DATEFMT: &str = "%H:%M:%S";

/// A parsed, cross-checked logging configuration. Catalogs keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub loggers: Vec<LoggerSection>,
    pub handlers: Vec<HandlerSection>,
    pub formatters: Vec<FormatterSection>,
}

/// One handler together with the targets routed to it.
#[derive(Debug, Clone)]
pub struct HandlerRoute<'a> {
    pub handler: &'a HandlerSection,
    pub formatter: Option<&'a FormatterSection>,
    /// Level for targets not listed in `targets` (the root logger's routing).
    pub default: LevelFilter,
    pub targets: Vec<(String, LevelFilter)>,
}

impl LogConfig {
    /// Built-in configuration: INFO and above to stderr.
    pub fn default_config() -> Self {
        LogConfig {
            loggers: vec![LoggerSection {
                name: "root".to_string(),
                level: Some(LogLevel::Info),
                handlers: vec!["consoleHandler".to_string()],
                qualname: None,
                propagate: true,
            }],
            handlers: vec![HandlerSection {
                name: "consoleHandler".to_string(),
                class: HandlerClass::Stderr,
                class_name: "StreamHandler".to_string(),
                level: None,
                formatter: Some("defaultFormatter".to_string()),
                args: "(sys.stderr,)".to_string(),
            }],
            formatters: vec![FormatterSection {
                name: "defaultFormatter".to_string(),
                format: Some(DEFAULT_FORMAT.to_string()),
                datefmt: Some(DEFAULT_DATEFMT.to_string()),
            }],
        }
    }

    pub fn load(path: &Path) -> Result<Self, LogConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| LogConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, LogConfigError> {
        let ini = Ini::parse(text)?;

        let logger_names = ini.catalog("loggers")?;
        let handler_names = ini.catalog("handlers")?;
        let formatter_names = ini.catalog("formatters")?;

        let mut formatters = Vec::with_capacity(formatter_names.len());
        for name in &formatter_names {
            let section_name = format!("formatter_{name}");
            let section = ini.require(&section_name)?;
            let datefmt = section.get("datefmt").map(str::to_string);
            if let Some(d) = &datefmt
                && !is_valid_datefmt(d)
            {
                return Err(LogConfigError::InvalidDatefmt {
                    section: section_name,
                    datefmt: d.clone(),
                });
            }
            formatters.push(FormatterSection {
                name: name.clone(),
                format: section.get("format").map(str::to_string),
                datefmt,
            });
        }

        let mut handlers = Vec::with_capacity(handler_names.len());
        for name in &handler_names {
            let section_name = format!("handler_{name}");
            let section = ini.require(&section_name)?;
            let class_name = section
                .get("class")
                .ok_or_else(|| LogConfigError::MissingKey {
                    section: section_name.clone(),
                    key: "class".to_string(),
                })?
                .to_string();
            let args = section.get("args").unwrap_or("()").to_string();
            let formatter = section
                .get("formatter")
                .filter(|f| !f.is_empty())
                .map(str::to_string);
            if let Some(f) = &formatter
                && !formatter_names.contains(f)
            {
                return Err(LogConfigError::UndeclaredReference {
                    section: section_name,
                    kind: "formatter",
                    name: f.clone(),
                });
            }
            handlers.push(HandlerSection {
                name: name.clone(),
                class: handler_class(&class_name, &args),
                level: parse_level(&section_name, section.get("level"))?,
                formatter,
                class_name,
                args,
            });
        }

        let mut loggers = Vec::with_capacity(logger_names.len());
        for name in &logger_names {
            let section_name = format!("logger_{name}");
            let section = ini.require(&section_name)?;
            let refs = split_list(section.get("handlers").unwrap_or(""));
            if let Some(missing) = refs.iter().find(|h| !handler_names.contains(*h)) {
                return Err(LogConfigError::UndeclaredReference {
                    section: section_name,
                    kind: "handler",
                    name: missing.clone(),
                });
            }
            loggers.push(LoggerSection {
                name: name.clone(),
                level: parse_level(&section_name, section.get("level"))?,
                handlers: refs,
                qualname: section
                    .get("qualname")
                    .filter(|q| !q.is_empty())
                    .map(str::to_string),
                propagate: section.get("propagate").map(|p| p.trim() != "0").unwrap_or(true),
            });
        }

        Ok(LogConfig {
            loggers,
            handlers,
            formatters,
        })
    }

    pub fn root(&self) -> Option<&LoggerSection> {
        self.loggers.iter().find(|l| l.is_root())
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerSection> {
        self.handlers.iter().find(|h| h.name == name)
    }

    pub fn formatter(&self, name: &str) -> Option<&FormatterSection> {
        self.formatters.iter().find(|f| f.name == name)
    }

    /// Handlers that no logger refers to.
    pub fn unused_handlers(&self) -> Vec<&str> {
        self.handlers
            .iter()
            .filter(|h| !self.loggers.iter().any(|l| l.handlers.contains(&h.name)))
            .map(|h| h.name.as_str())
            .collect()
    }

    /// Nearest configured ancestor of a logger, by dotted name.
    fn parent_of(&self, logger: &LoggerSection) -> Option<&LoggerSection> {
        if logger.is_root() {
            return None;
        }
        let name = logger.logger_name();
        self.loggers
            .iter()
            .filter(|l| !l.is_root())
            .filter(|l| name.starts_with(&format!("{}.", l.logger_name())))
            .max_by_key(|l| l.logger_name().len())
            .or_else(|| self.root())
    }

    /// Effective level, inheriting from ancestors when unset or NOTSET.
    /// Without a root logger the implicit root level is WARNING.
    pub fn effective_level(&self, logger: &LoggerSection) -> LogLevel {
        match logger.level {
            Some(level) if level != LogLevel::NotSet || logger.is_root() => level,
            _ => match self.parent_of(logger) {
                Some(parent) => self.effective_level(parent),
                None => LogLevel::Warning,
            },
        }
    }

    fn routes_to(&self, logger: &LoggerSection, handler: &str) -> bool {
        if logger.handlers.iter().any(|h| h == handler) {
            return true;
        }
        logger.propagate
            && self
                .parent_of(logger)
                .is_some_and(|parent| self.routes_to(parent, handler))
    }

    /// EnvFilter directive string equivalent to the logger levels.
    ///
    /// `override_level` replaces every configured level.
    pub fn filter_directives(&self, override_level: Option<LogLevel>) -> String {
        if let Some(level) = override_level {
            return directive_level(level).to_string();
        }
        let root_level = self
            .root()
            .map(|r| self.effective_level(r))
            .unwrap_or(LogLevel::Warning);
        let mut directives = vec![directive_level(root_level).to_string()];
        for logger in self.loggers.iter().filter(|l| !l.is_root()) {
            directives.push(format!(
                "{}={}",
                logger.target(),
                directive_level(self.effective_level(logger))
            ));
        }
        directives.join(",")
    }

    /// Per-handler routing: which targets reach each handler and at what level.
    ///
    /// Only handlers referenced by some logger are returned.
    pub fn routes(&self, override_level: Option<LogLevel>) -> Vec<HandlerRoute<'_>> {
        let level_of = |logger: &LoggerSection| {
            override_level
                .unwrap_or_else(|| self.effective_level(logger))
                .level_filter()
        };
        self.handlers
            .iter()
            .filter(|h| self.loggers.iter().any(|l| l.handlers.contains(&h.name)))
            .map(|handler| {
                let cap = handler
                    .level
                    .map(|l| l.level_filter())
                    .unwrap_or(LevelFilter::TRACE);
                let default = match self.root() {
                    Some(root) if self.routes_to(root, &handler.name) => {
                        std::cmp::min(level_of(root), cap)
                    }
                    _ => LevelFilter::OFF,
                };
                let targets = self
                    .loggers
                    .iter()
                    .filter(|l| !l.is_root())
                    .map(|logger| {
                        let level = if self.routes_to(logger, &handler.name) {
                            std::cmp::min(level_of(logger), cap)
                        } else {
                            LevelFilter::OFF
                        };
                        (logger.target(), level)
                    })
                    .collect();
                HandlerRoute {
                    handler,
                    formatter: handler.formatter.as_deref().and_then(|f| self.formatter(f)),
                    default,
                    targets,
                }
            })
            .collect()
    }
}

impl fmt::Display for LogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[loggers]")?;
        writeln!(f, "keys={}\n", join_names(self.loggers.iter().map(|l| l.name.as_str())))?;
        writeln!(f, "[handlers]")?;
        writeln!(f, "keys={}\n", join_names(self.handlers.iter().map(|h| h.name.as_str())))?;
        writeln!(f, "[formatters]")?;
        writeln!(f, "keys={}", join_names(self.formatters.iter().map(|x| x.name.as_str())))?;
        for logger in &self.loggers {
            writeln!(f, "\n[logger_{}]", logger.name)?;
            if let Some(level) = logger.level {
                writeln!(f, "level={level}")?;
            }
            writeln!(f, "handlers={}", logger.handlers.join(","))?;
            if let Some(q) = &logger.qualname {
                writeln!(f, "qualname={q}")?;
            }
            if !logger.propagate {
                writeln!(f, "propagate=0")?;
            }
        }
        for handler in &self.handlers {
            writeln!(f, "\n[handler_{}]", handler.name)?;
            writeln!(f, "class={}", handler.class_name)?;
            if let Some(level) = handler.level {
                writeln!(f, "level={level}")?;
            }
            if let Some(formatter) = &handler.formatter {
                writeln!(f, "formatter={formatter}")?;
            }
            writeln!(f, "args={}", handler.args)?;
        }
        for formatter in &self.formatters {
            writeln!(f, "\n[formatter_{}]", formatter.name)?;
            if let Some(format) = &formatter.format {
                writeln!(f, "format={format}")?;
            }
            if let Some(datefmt) = &formatter.datefmt {
                writeln!(f, "datefmt={datefmt}")?;
            }
        }
        Ok(())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(",")
}

fn directive_level(level: LogLevel) -> &'static str {
    match level {
        LogLevel::NotSet => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warning => "warn",
        LogLevel::Error | LogLevel::Critical => "error",
    }
}

fn parse_level(section: &str, value: Option<&str>) -> Result<Option<LogLevel>, LogConfigError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| LogConfigError::InvalidLevel {
                section: section.to_string(),
                value: v.to_string(),
            }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a tuple literal like `('ocrd.log', 'a')` into its items, unquoted.
pub fn parse_args(args: &str) -> Vec<String> {
    let inner = args.trim().trim_start_matches('(').trim_end_matches(')');
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, ',') => {
                items.push(std::mem::take(&mut current).trim().to_string());
            }
            (None, c) => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items.retain(|s| !s.is_empty());
    items
}

/// Whether chrono can render every specifier in `datefmt`.
pub fn is_valid_datefmt(datefmt: &str) -> bool {
    !StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error))
}

fn handler_class(class_name: &str, args: &str) -> HandlerClass {
    let short = class_name
        .trim()
        .trim_start_matches("logging.")
        .trim_start_matches("handlers.");
    let args = parse_args(args);
    match short {
        "StreamHandler" => match args.first().map(String::as_str) {
            Some("sys.stdout") | Some("ext://sys.stdout") => HandlerClass::Stdout,
            _ => HandlerClass::Stderr,
        },
        "FileHandler" | "RotatingFileHandler" | "WatchedFileHandler" => match args.first() {
            Some(path) => HandlerClass::File {
                path: PathBuf::from(path),
                truncate: args.get(1).is_some_and(|m| m == "w"),
            },
            None => HandlerClass::Other(class_name.to_string()),
        },
        "TimedRotatingFileHandler" => match args.first() {
            Some(path) => HandlerClass::RollingFile {
                path: PathBuf::from(path),
                rotation: match args.get(1).map(|w| w.to_ascii_uppercase()).as_deref() {
                    Some("M") | Some("S") => Rotation::Minutely,
                    Some("H") => Rotation::Hourly,
                    _ => Rotation::Daily,
                },
            },
            None => HandlerClass::Other(class_name.to_string()),
        },
        "NullHandler" => HandlerClass::Null,
        _ => HandlerClass::Other(class_name.to_string()),
    }
}

/// Candidate locations for the logging configuration, in lookup order.
pub fn log_config_search_path(cwd: Option<&Path>, home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(cwd) = cwd {
        candidates.push(cwd.join(LOG_CONFIG_FILENAME));
    }
    if let Some(home) = home {
        candidates.push(home.join(LOG_CONFIG_FILENAME));
    }
    candidates.push(Path::new(SYSTEM_CONFIG_DIR).join(LOG_CONFIG_FILENAME));
    candidates
}

/// First existing logging configuration along the search path.
pub fn find_log_config(cwd: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    log_config_search_path(cwd, home)
        .into_iter()
        .find(|p| p.is_file())
}

/// [`find_log_config`] for the process' working directory and the user's home.
pub fn discover_log_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    let home = dirs::home_dir();
    find_log_config(cwd.as_deref(), home.as_deref())
}

/// Minimal INI reader: ordered sections, lower-cased keys, continuation lines.
struct Ini {
    sections: Vec<IniSection>,
}

struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Ini {
    fn parse(text: &str) -> Result<Self, LogConfigError> {
        let mut sections: Vec<IniSection> = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if raw.starts_with([' ', '\t']) {
                // continuation of the previous value
                let entry = sections
                    .last_mut()
                    .and_then(|s| s.entries.last_mut())
                    .ok_or_else(|| LogConfigError::Syntax {
                        line,
                        message: "continuation line without a preceding key".to_string(),
                    })?;
                if !entry.1.is_empty() {
                    entry.1.push('\n');
                }
                entry.1.push_str(trimmed);
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| LogConfigError::Syntax {
                        line,
                        message: format!("unterminated section header '{trimmed}'"),
                    })?
                    .trim()
                    .to_string();
                if sections.iter().any(|s| s.name == name) {
                    return Err(LogConfigError::DuplicateSection(name));
                }
                sections.push(IniSection {
                    name,
                    entries: Vec::new(),
                });
                continue;
            }
            let sep = trimmed.find(['=', ':']).ok_or_else(|| LogConfigError::Syntax {
                line,
                message: format!("expected 'key=value', got '{trimmed}'"),
            })?;
            let key = trimmed[..sep].trim().to_ascii_lowercase();
            let value = trimmed[sep + 1..].trim().to_string();
            let section = sections.last_mut().ok_or_else(|| LogConfigError::Syntax {
                line,
                message: "key outside of any section".to_string(),
            })?;
            match section.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => section.entries.push((key, value)),
            }
        }
        Ok(Ini { sections })
    }

    fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn require(&self, name: &str) -> Result<&IniSection, LogConfigError> {
        self.section(name)
            .ok_or_else(|| LogConfigError::MissingSection(name.to_string()))
    }

    fn catalog(&self, name: &str) -> Result<Vec<String>, LogConfigError> {
        Ok(split_list(self.require(name)?.get("keys").unwrap_or("")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args("(sys.stderr,)"), vec!["sys.stderr"]);
        assert_eq!(parse_args("('ocrd.log', 'a')"), vec!["ocrd.log", "a"]);
        assert_eq!(parse_args("(\"a,b.log\",)"), vec!["a,b.log"]);
        assert!(parse_args("()").is_empty());
    }

    #[test]
    fn test_handler_class() {
        assert_eq!(handler_class("StreamHandler", "(sys.stderr,)"), HandlerClass::Stderr);
        assert_eq!(handler_class("logging.StreamHandler", "(sys.stdout,)"), HandlerClass::Stdout);
        assert_eq!(
            handler_class("FileHandler", "('ocrd.log','w')"),
            HandlerClass::File {
                path: PathBuf::from("ocrd.log"),
                truncate: true
            }
        );
        assert_eq!(
            handler_class("handlers.TimedRotatingFileHandler", "('ocrd.log','H')"),
            HandlerClass::RollingFile {
                path: PathBuf::from("ocrd.log"),
                rotation: Rotation::Hourly
            }
        );
        assert_eq!(
            handler_class("handlers.SysLogHandler", "()"),
            HandlerClass::Other("handlers.SysLogHandler".to_string())
        );
    }

    #[test]
    fn test_ini_continuation_and_comments() {
        let ini = Ini::parse("# comment\n[a]\nkey = one\n  two\n; other\nOther: x\n").unwrap();
        let section = ini.section("a").unwrap();
        assert_eq!(section.get("key"), Some("one\ntwo"));
        assert_eq!(section.get("other"), Some("x"));
    }

    #[test]
    fn test_ini_rejects_key_outside_section() {
        assert!(matches!(
            Ini::parse("key=value\n"),
            Err(LogConfigError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("CRITICAL".parse::<LogLevel>(), Ok(LogLevel::Critical));
        assert!("LOUD".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Critical.level_filter(), LevelFilter::ERROR);
    }
}
