//! Text consistency of PAGE-XML documents.
//!
//! Each level of the text hierarchy carries its own `TextEquiv/Unicode`.
//! A parent's text must equal the concatenation of its children's: lines
//! of a region joined by newlines, words of a line by spaces, glyphs of a
//! word without separator.

use crate::{error::ValidatorError, report::ValidationReport};
use ocrd_models::{
    constants::NS_PAGE_PREFIX,
    xml::{Element, XmlDocument},
};
use std::{fmt, path::Path, str::FromStr};
use tracing::{debug, info};

/// (parent, child, joiner) for every level that has children.
const HIERARCHY: &[(&str, &str, &str)] = &[
    ("TextRegion", "TextLine", "\n"),
    ("TextLine", "Word", " "),
    ("Word", "Glyph", ""),
];

/// How text mismatches are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageStrictness {
    /// Texts must match exactly.
    #[default]
    Strict,
    /// Whitespace is ignored when comparing.
    Lax,
    /// Mismatching parent texts are replaced with the concatenation.
    Fix,
    /// No consistency checks.
    Off,
}

impl FromStr for PageStrictness {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "fix" => Ok(Self::Fix),
            "off" => Ok(Self::Off),
            other => Err(ValidatorError::InvalidStrictness(other.to_string())),
        }
    }
}

impl fmt::Display for PageStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::Fix => "fix",
            Self::Off => "off",
        })
    }
}

fn is_page(el: &Element, local: &str) -> bool {
    el.local_name() == local
        && el
            .namespace
            .as_deref()
            .is_some_and(|ns| ns.starts_with(NS_PAGE_PREFIX))
}

/// `TextEquiv/Unicode` of the first `TextEquiv`.
fn text_of(el: &Element) -> Option<String> {
    let equiv = el.elements().find(|e| is_page(e, "TextEquiv"))?;
    let unicode = equiv.elements().find(|e| is_page(e, "Unicode"))?;
    Some(unicode.text())
}

fn set_text_of(el: &mut Element, text: &str) {
    if let Some(unicode) = el
        .elements_mut()
        .find(|e| is_page(e, "TextEquiv"))
        .and_then(|equiv| equiv.elements_mut().find(|e| is_page(e, "Unicode")))
    {
        unicode.set_text(text);
    }
}

fn texts_match(a: &str, b: &str, strictness: PageStrictness) -> bool {
    match strictness {
        PageStrictness::Lax => a
            .chars()
            .filter(|c| !c.is_whitespace())
            .eq(b.chars().filter(|c| !c.is_whitespace())),
        _ => a == b,
    }
}

struct Checker<'a> {
    strictness: PageStrictness,
    file_id: &'a str,
    report: ValidationReport,
}

impl Checker<'_> {
    /// Check all `TextRegion`s below `el`, including nested ones.
    fn visit(&mut self, el: &mut Element) {
        for child in el.elements_mut() {
            if is_page(child, "TextRegion") {
                self.check_level(child, 0);
            }
            self.visit(child);
        }
    }

    fn check_level(&mut self, el: &mut Element, level: usize) {
        let (kind, child_kind, joiner) = HIERARCHY[level];
        if level + 1 < HIERARCHY.len() {
            for child in el.elements_mut().filter(|c| is_page(c, child_kind)) {
                self.check_level(child, level + 1);
            }
        }

        let children: Vec<&Element> = el.elements().filter(|c| is_page(c, child_kind)).collect();
        if children.is_empty() {
            return;
        }
        let Some(texts) = children.iter().map(|c| text_of(c)).collect::<Option<Vec<_>>>() else {
            return;
        };
        let Some(actual) = text_of(el) else {
            return;
        };
        let concatenated = texts.join(joiner);
        if texts_match(&actual, &concatenated, self.strictness) {
            return;
        }
        let id = el.attr("id").unwrap_or("").to_string();
        if self.strictness == PageStrictness::Fix {
            debug!("Fixing text of {kind} '{id}'");
            set_text_of(el, &concatenated);
            self.report.add_notice(format!(
                "Fixed {kind} ID '{id}' of file '{}': '{actual}' -> '{concatenated}'",
                self.file_id
            ));
        } else {
            self.report.add_error(format!(
                "INCONSISTENCY in {kind} ID '{id}' of file '{}': text results '{actual}' != concatenated '{concatenated}'",
                self.file_id
            ));
        }
    }
}

pub struct PageValidator;

impl PageValidator {
    /// Check `doc`; with [`PageStrictness::Fix`] the document is updated in place.
    pub fn validate(doc: &mut XmlDocument, strictness: PageStrictness, file_id: &str) -> ValidationReport {
        let mut checker = Checker {
            strictness,
            file_id,
            report: ValidationReport::new(),
        };
        if strictness == PageStrictness::Off {
            return checker.report;
        }
        if !is_page(&doc.root, "PcGts") {
            checker
                .report
                .add_error(format!("File '{file_id}' is not a PAGE-XML document"));
            return checker.report;
        }
        checker.visit(&mut doc.root);
        checker.report
    }

    /// Check a PAGE file on disk. Fixes are written back.
    pub fn validate_file(path: &Path, strictness: PageStrictness, file_id: &str) -> ValidationReport {
        let mut report = ValidationReport::new();
        let xml = match std::fs::read_to_string(path) {
            Ok(xml) => xml,
            Err(e) => {
                report.add_error(format!("Failed to read PAGE file '{}': {e}", path.display()));
                return report;
            }
        };
        let mut doc = match XmlDocument::parse(&xml) {
            Ok(doc) => doc,
            Err(e) => {
                report.add_error(format!("Failed to parse PAGE file '{}': {e}", path.display()));
                return report;
            }
        };
        report.merge(Self::validate(&mut doc, strictness, file_id));
        if strictness == PageStrictness::Fix && !report.notices.is_empty() {
            info!("Writing fixed PAGE to {}", path.display());
            if let Err(e) = std::fs::write(path, doc.to_xml_string()) {
                report.add_error(format!("Failed to write PAGE file '{}': {e}", path.display()));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15";

    fn te(text: &str) -> String {
        format!("<pc:TextEquiv><pc:Unicode>{text}</pc:Unicode></pc:TextEquiv>")
    }

    /// One region with one line of two words; word `w1` has glyphs.
    fn page(region: &str, line: &str, words: [&str; 2], glyphs: [&str; 2]) -> XmlDocument {
        let xml = format!(
            r#"<pc:PcGts xmlns:pc="{NS}"><pc:Page><pc:TextRegion id="r1"><pc:TextLine id="l1"><pc:Word id="w1"><pc:Glyph id="g1">{}</pc:Glyph><pc:Glyph id="g2">{}</pc:Glyph>{}</pc:Word><pc:Word id="w2">{}</pc:Word>{}</pc:TextLine>{}</pc:TextRegion></pc:Page></pc:PcGts>"#,
            te(glyphs[0]),
            te(glyphs[1]),
            te(words[0]),
            te(words[1]),
            te(line),
            te(region),
        );
        XmlDocument::parse(&xml).unwrap()
    }

    #[test]
    fn test_strictness_from_str() {
        assert_eq!("lax".parse::<PageStrictness>().unwrap(), PageStrictness::Lax);
        assert!("sloppy".parse::<PageStrictness>().is_err());
        assert_eq!(PageStrictness::Fix.to_string(), "fix");
    }

    #[test]
    fn test_consistent_page() {
        let mut doc = page("ab cd", "ab cd", ["ab", "cd"], ["a", "b"]);
        let report = PageValidator::validate(&mut doc, PageStrictness::Strict, "F1");
        assert!(report.is_valid(), "{report}");
    }

    #[test]
    fn test_word_glyph_mismatch() {
        let mut doc = page("ab cd", "ab cd", ["ab", "cd"], ["a", "x"]);
        let report = PageValidator::validate(&mut doc, PageStrictness::Strict, "F1");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Word ID 'w1'"));
        assert!(report.errors[0].contains("'ab' != concatenated 'ax'"));
    }

    #[test]
    fn test_lax_ignores_whitespace() {
        let mut doc = page("ab  cd", "abcd", ["ab", "cd"], ["a", "b"]);
        let strict = PageValidator::validate(&mut doc.clone(), PageStrictness::Strict, "F1");
        assert_eq!(strict.errors.len(), 2);
        let lax = PageValidator::validate(&mut doc, PageStrictness::Lax, "F1");
        assert!(lax.is_valid(), "{lax}");
    }

    #[test]
    fn test_fix_rewrites_bottom_up() {
        let mut doc = page("xx", "yy", ["zz", "cd"], ["a", "b"]);
        let report = PageValidator::validate(&mut doc, PageStrictness::Fix, "F1");
        assert!(report.is_valid());
        assert_eq!(report.notices.len(), 3);
        let again = PageValidator::validate(&mut doc, PageStrictness::Strict, "F1");
        assert!(again.is_valid(), "{again}");
        assert!(doc.to_xml_string().contains("<pc:Unicode>ab cd</pc:Unicode>"));
    }

    #[test]
    fn test_off_skips() {
        let mut doc = page("xx", "yy", ["zz", "cd"], ["a", "b"]);
        assert!(PageValidator::validate(&mut doc, PageStrictness::Off, "F1").is_valid());
    }

    #[test]
    fn test_missing_text_is_not_an_error() {
        let xml = format!(
            r#"<PcGts xmlns="{NS}"><Page><TextRegion id="r1"><TextLine id="l1">{}</TextLine></TextRegion></Page></PcGts>"#,
            te("orphan").replace("pc:", "")
        );
        let mut doc = XmlDocument::parse(&xml).unwrap();
        assert!(PageValidator::validate(&mut doc, PageStrictness::Strict, "F1").is_valid());
    }

    #[test]
    fn test_older_namespace_and_nested_regions() {
        let old = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15";
        let xml = format!(
            r#"<PcGts xmlns="{old}"><Page><TableRegion><TextRegion id="r9"><TextLine id="l9"><TextEquiv><Unicode>b</Unicode></TextEquiv></TextLine><TextEquiv><Unicode>a</Unicode></TextEquiv></TextRegion></TableRegion></Page></PcGts>"#
        );
        let mut doc = XmlDocument::parse(&xml).unwrap();
        let report = PageValidator::validate(&mut doc, PageStrictness::Strict, "F1");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("TextRegion ID 'r9'"));
    }

    #[test]
    fn test_not_page() {
        let mut doc = XmlDocument::parse("<foo/>").unwrap();
        let report = PageValidator::validate(&mut doc, PageStrictness::Strict, "F1");
        assert!(report.errors[0].contains("not a PAGE-XML document"));
    }

    #[test]
    fn test_validate_file_writes_fix() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.xml");
        std::fs::write(&path, page("xx", "ab cd", ["ab", "cd"], ["a", "b"]).to_xml_string()).unwrap();
        let report = PageValidator::validate_file(&path, PageStrictness::Fix, "F1");
        assert_eq!(report.notices.len(), 1);
        let fixed = std::fs::read_to_string(&path).unwrap();
        assert!(!fixed.contains(">xx<"));

        let missing = PageValidator::validate_file(&dir.path().join("nope.xml"), PageStrictness::Strict, "F2");
        assert!(missing.errors[0].starts_with("Failed to read PAGE file"));
    }
}
