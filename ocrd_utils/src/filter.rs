//! Literal-or-regex string filters used by METS file searches.
//!
//! A filter value starting with [`REGEX_PREFIX`] (`//`) is a regular
//! expression that must match the whole candidate; anything else is compared
//! for equality.

use crate::constants::REGEX_PREFIX;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone)]
pub enum StringFilter {
    Literal(String),
    Pattern(Regex),
}

impl StringFilter {
    /// Parse a filter expression.
    pub fn parse(expr: &str) -> Result<Self, regex::Error> {
        match expr.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => Ok(StringFilter::Pattern(Regex::new(&format!("^(?:{pattern})$"))?)),
            None => Ok(StringFilter::Literal(expr.to_string())),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, StringFilter::Pattern(_))
    }

    /// Whether `candidate` passes. A missing candidate never matches.
    pub fn matches(&self, candidate: Option<&str>) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        match self {
            StringFilter::Literal(s) => s == candidate,
            StringFilter::Pattern(re) => re.is_match(candidate),
        }
    }
}

impl fmt::Display for StringFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringFilter::Literal(s) => write!(f, "{s}"),
            StringFilter::Pattern(re) => {
                let inner = re
                    .as_str()
                    .strip_prefix("^(?:")
                    .and_then(|s| s.strip_suffix(")$"))
                    .unwrap_or(re.as_str());
                write!(f, "{REGEX_PREFIX}{inner}")
            }
        }
    }
}
