//! Event formatter that understands `%(field)s` format strings.
//!
//! Supported fields: `asctime`, `msecs`, `levelname`, `levelno`, `name`,
//! `message`, `module`, `filename`, `pathname`, `lineno`, `threadName`,
//! `process`. Width, left-alignment and zero-padding flags are honoured
//! (`%(levelname)-8s`, `%(msecs)03d`). Unknown fields are copied verbatim.

use crate::log_config::{DEFAULT_DATEFMT, DEFAULT_FORMAT, FormatterSection};
use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    registry::LookupSpan,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field { name: String, spec: String },
}

/// The parts of a log event a format string can refer to.
#[derive(Debug, Clone)]
pub struct LogRecord<'a> {
    pub time: DateTime<Local>,
    pub level: Level,
    pub target: &'a str,
    pub message: &'a str,
    pub module_path: Option<&'a str>,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PythonStyleFormat {
    tokens: Vec<Token>,
    datefmt: Option<String>,
}

impl Default for PythonStyleFormat {
    fn default() -> Self {
        Self::new(DEFAULT_FORMAT, Some(DEFAULT_DATEFMT))
    }
}

impl PythonStyleFormat {
    pub fn new(format: &str, datefmt: Option<&str>) -> Self {
        Self {
            tokens: tokenize(format),
            datefmt: datefmt.map(str::to_string),
        }
    }

    /// Formatter for a handler; falls back to the default layout.
    pub fn from_formatter(formatter: Option<&FormatterSection>) -> Self {
        match formatter {
            Some(f) => Self::new(
                f.format.as_deref().unwrap_or("%(message)s"),
                f.datefmt.as_deref(),
            ),
            None => Self::new("%(message)s", None),
        }
    }

    pub fn render(&self, record: &LogRecord<'_>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Field { name, spec } => match self.field(name, record) {
                    Some(FieldValue::Text(s)) => out.push_str(&apply_spec(&s, spec, false)),
                    Some(FieldValue::Number(n)) => {
                        out.push_str(&apply_spec(&n.to_string(), spec, true))
                    }
                    None => {
                        let _ = write!(out, "%({name}){spec}");
                    }
                },
            }
        }
        out
    }

    fn field(&self, name: &str, record: &LogRecord<'_>) -> Option<FieldValue> {
        let value = match name {
            "asctime" => FieldValue::Text(match &self.datefmt {
                Some(datefmt) => {
                    let mut stamp = String::new();
                    match write!(stamp, "{}", record.time.format(datefmt)) {
                        Ok(()) => stamp,
                        Err(fmt::Error) => datefmt.clone(),
                    }
                }
                None => format!(
                    "{},{:03}",
                    record.time.format("%Y-%m-%d %H:%M:%S"),
                    record.time.timestamp_subsec_millis()
                ),
            }),
            "msecs" => FieldValue::Number(i64::from(record.time.timestamp_subsec_millis())),
            "levelname" => FieldValue::Text(level_name(&record.level).to_string()),
            "levelno" => FieldValue::Number(level_number(&record.level)),
            "name" => FieldValue::Text(record.target.replace("::", ".")),
            "message" => FieldValue::Text(record.message.to_string()),
            "module" => FieldValue::Text(
                record
                    .module_path
                    .and_then(|m| m.rsplit("::").next())
                    .unwrap_or_default()
                    .to_string(),
            ),
            "filename" => FieldValue::Text(
                record
                    .file
                    .and_then(|f| f.rsplit(['/', '\\']).next())
                    .unwrap_or_default()
                    .to_string(),
            ),
            "pathname" => FieldValue::Text(record.file.unwrap_or_default().to_string()),
            "lineno" => FieldValue::Number(i64::from(record.line.unwrap_or(0))),
            "threadName" => FieldValue::Text(
                std::thread::current()
                    .name()
                    .unwrap_or("unnamed")
                    .to_string(),
            ),
            "process" => FieldValue::Number(i64::from(std::process::id())),
            _ => return None,
        };
        Some(value)
    }
}

enum FieldValue {
    Text(String),
    Number(i64),
}

/// Level names as log readers expect them (`WARNING` rather than `WARN`).
pub fn level_name(level: &Level) -> &'static str {
    match level.as_str() {
        "WARN" => "WARNING",
        other => other,
    }
}

fn level_number(level: &Level) -> i64 {
    match level.as_str() {
        "ERROR" => 40,
        "WARN" => 30,
        "INFO" => 20,
        "DEBUG" => 10,
        _ => 5,
    }
}

fn tokenize(format: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = format;
    while let Some(pos) = rest.find('%') {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('%') {
            literal.push('%');
            rest = tail;
            continue;
        }
        let parsed = after.strip_prefix('(').and_then(|inner| {
            let close = inner.find(')')?;
            let name = &inner[..close];
            let spec_src = &inner[close + 1..];
            let conv = spec_src.find(|c: char| c.is_ascii_alphabetic())?;
            Some((name, &spec_src[..=conv], &spec_src[conv + 1..]))
        });
        match parsed {
            Some((name, spec, tail)) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Field {
                    name: name.to_string(),
                    spec: spec.to_string(),
                });
                rest = tail;
            }
            None => {
                literal.push('%');
                rest = after;
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Apply `-`, `0` and width flags of a conversion spec such as `-8s` or `03d`.
fn apply_spec(value: &str, spec: &str, numeric: bool) -> String {
    let flags = &spec[..spec.len().saturating_sub(1)];
    let left = flags.starts_with('-');
    let digits = flags.trim_start_matches('-');
    let zero = numeric && digits.starts_with('0');
    let width: usize = digits.parse().unwrap_or(0);
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }
    let pad = width - len;
    if left {
        format!("{value}{}", " ".repeat(pad))
    } else if zero {
        format!("{}{value}", "0".repeat(pad))
    } else {
        format!("{}{value}", " ".repeat(pad))
    }
}

impl<S, N> FormatEvent<S, N> for PythonStyleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut message = String::new();
        ctx.field_format()
            .format_fields(Writer::new(&mut message), event)?;
        let record = LogRecord {
            time: Local::now(),
            level: *meta.level(),
            target: meta.target(),
            message: &message,
            module_path: meta.module_path(),
            file: meta.file(),
            line: meta.line(),
        };
        writeln!(writer, "{}", self.render(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record<'a>(message: &'a str) -> LogRecord<'a> {
        LogRecord {
            time: Local.with_ymd_and_hms(2024, 3, 1, 13, 37, 42).unwrap()
                + chrono::Duration::milliseconds(7),
            level: Level::WARN,
            target: "ocrd::resolver",
            message,
            module_path: Some("ocrd::resolver"),
            file: Some("ocrd/src/resolver.rs"),
            line: Some(42),
        }
    }

    #[test]
    fn test_default_format() {
        let out = PythonStyleFormat::default().render(&record("Downloading"));
        assert_eq!(out, "13:37:42.007 WARNING ocrd.resolver - Downloading");
    }

    #[test]
    fn test_padding_flags() {
        let f = PythonStyleFormat::new("[%(levelname)-8s|%(lineno)5d|%(msecs)03d]", None);
        assert_eq!(f.render(&record("")), "[WARNING |   42|007]");
    }

    #[test]
    fn test_source_fields_and_escapes() {
        let f = PythonStyleFormat::new("%(module)s:%(filename)s 100%% %(message)s", None);
        assert_eq!(f.render(&record("done")), "resolver:resolver.rs 100% done");
    }

    #[test]
    fn test_unknown_field_is_verbatim() {
        let f = PythonStyleFormat::new("%(funcName)s %(message)s %", None);
        assert_eq!(f.render(&record("x")), "%(funcName)s x %");
    }

    #[test]
    fn test_unrenderable_datefmt_is_copied() {
        let f = PythonStyleFormat::new("%(asctime)s %(message)s", Some("%H:%M:%S %Q"));
        assert_eq!(f.render(&record("x")), "%H:%M:%S %Q x");
        let f = PythonStyleFormat::new("%(asctime)s", Some("%Y %"));
        assert_eq!(f.render(&record("")), "%Y %");
    }

    #[test]
    fn test_asctime_without_datefmt() {
        let f = PythonStyleFormat::new("%(asctime)s", None);
        assert_eq!(f.render(&record("")), "2024-03-01 13:37:42,007");
    }
}
