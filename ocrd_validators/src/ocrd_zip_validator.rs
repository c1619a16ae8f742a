//! Validation of OCRD-ZIP bags against the OCR-D BagIt profile.

use crate::report::ValidationReport;
use ocrd::workspace_bagger::{
    BAG_INFO_TXT, MANIFEST_TXT, TAGMANIFEST_TXT, bag_relative, parse_bag_info, parse_manifest,
    sha512_file, unzip,
};
use ocrd_utils::constants::{DEFAULT_METS_BASENAME, OCRD_BAGIT_PROFILE_URL, TMP_BAGIT_PREFIX};
use std::{collections::HashSet, path::Path};
use tracing::{debug, info};
use walkdir::WalkDir;

/// `bag-info.txt` keys every OCRD-ZIP must have.
pub const REQUIRED_BAG_INFO: &[&str] = &[
    "BagIt-Profile-Identifier",
    "Ocrd-Identifier",
    "Ocrd-Manifestation-Depth",
    "Payload-Oxum",
];

pub struct OcrdZipValidator;

impl OcrdZipValidator {
    /// Validate the zipped bag (or unpacked bag directory) at `path`.
    pub fn validate(path: &Path) -> ValidationReport {
        let mut report = ValidationReport::new();
        if path.is_dir() {
            validate_bag(path, &mut report);
            return report;
        }
        let tmp = match tempfile::Builder::new().prefix(TMP_BAGIT_PREFIX).tempdir() {
            Ok(tmp) => tmp,
            Err(e) => {
                report.add_error(format!("Failed to create temporary directory: {e}"));
                return report;
            }
        };
        debug!("Unpacking {} to {}", path.display(), tmp.path().display());
        if let Err(e) = unzip(path, tmp.path()) {
            report.add_error(format!("Failed to unpack '{}': {e}", path.display()));
            return report;
        }
        validate_bag(tmp.path(), &mut report);
        report
    }
}

fn read(bag: &Path, name: &str, report: &mut ValidationReport) -> Option<String> {
    match std::fs::read_to_string(bag.join(name)) {
        Ok(text) => Some(text),
        Err(e) => {
            report.add_error(format!("Cannot read {name}: {e}"));
            None
        }
    }
}

fn validate_bag(bag: &Path, report: &mut ValidationReport) {
    info!("Validating bag {}", bag.display());
    if let Some(bagit) = read(bag, "bagit.txt", report)
        && !bagit.lines().any(|l| l.starts_with("BagIt-Version:"))
    {
        report.add_error("bagit.txt has no BagIt-Version");
    }

    let info = read(bag, BAG_INFO_TXT, report)
        .map(|text| parse_bag_info(&text))
        .unwrap_or_default();
    let get = |key: &str| info.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
    for key in REQUIRED_BAG_INFO {
        if get(key).is_none() {
            report.add_error(format!("Missing required bag-info.txt key '{key}'"));
        }
    }
    if let Some(profile) = get("BagIt-Profile-Identifier")
        && profile != OCRD_BAGIT_PROFILE_URL
    {
        report.add_error(format!(
            "BagIt-Profile-Identifier '{profile}' is not '{OCRD_BAGIT_PROFILE_URL}'"
        ));
    }
    if let Some(depth) = get("Ocrd-Manifestation-Depth")
        && !matches!(depth, "full" | "partial")
    {
        report.add_error(format!(
            "Ocrd-Manifestation-Depth must be 'full' or 'partial', not '{depth}'"
        ));
    }
    let mets = get("Ocrd-Mets").unwrap_or(DEFAULT_METS_BASENAME);
    if !bag.join("data").join(mets).is_file() {
        report.add_error(format!("METS file 'data/{mets}' is missing"));
    }

    let Some(manifest) = read(bag, MANIFEST_TXT, report) else {
        return;
    };
    let manifest = parse_manifest(&manifest);
    verify_checksums(bag, &manifest, report);

    let listed: HashSet<&str> = manifest.iter().map(|(_, p)| p.as_str()).collect();
    let mut total_bytes = 0u64;
    let mut total_files = 0usize;
    for entry in WalkDir::new(bag.join("data")).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.add_error(format!("Cannot read payload: {e}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        total_files += 1;
        total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        let rel = bag_relative(bag, entry.path());
        if !listed.contains(rel.as_str()) {
            report.add_error(format!("Payload file '{rel}' is not in {MANIFEST_TXT}"));
        }
    }
    if let Some(oxum) = get("Payload-Oxum") {
        let actual = format!("{total_bytes}.{total_files}");
        if oxum != actual {
            report.add_error(format!("Payload-Oxum mismatch: declared {oxum}, found {actual}"));
        }
    }

    if bag.join(TAGMANIFEST_TXT).is_file()
        && let Some(tags) = read(bag, TAGMANIFEST_TXT, report)
    {
        verify_checksums(bag, &parse_manifest(&tags), report);
    }
}

fn verify_checksums(bag: &Path, entries: &[(String, String)], report: &mut ValidationReport) {
    for (expected, rel) in entries {
        match sha512_file(&bag.join(rel)) {
            Ok(actual) if &actual == expected => {}
            Ok(_) => report.add_error(format!("Checksum mismatch for '{rel}'")),
            Err(e) => report.add_error(format!("Cannot verify '{rel}': {e}")),
        }
    }
}
