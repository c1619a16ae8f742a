use quick_xml::escape::escape;
use std::fmt;

/// Errors, warnings and notices collected by a validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub notices: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_notice(&mut self, msg: impl Into<String>) {
        self.notices.push(msg.into());
    }

    /// Valid means no errors. Warnings and notices don't count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.notices.extend(other.notices);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<report valid=\"{}\">", self.is_valid())?;
        for (tag, msgs) in [
            ("warning", &self.warnings),
            ("error", &self.errors),
            ("notice", &self.notices),
        ] {
            for msg in msgs {
                write!(f, "\n  <{tag}>{}</{tag}>", escape(msg.as_str()))?;
            }
        }
        write!(f, "\n</report>")
    }
}
