//! # Workspace Validation
//!
//! Checks a workspace's METS and files against the OCR-D conventions.
//! Every check has a name and can be skipped:
//!
//! - `mets_unique_identifier`: the METS has an identifier.
//! - `mets_file_group_names`: fileGrp `USE` follows `OCR-D-<CATEGORY>[-<NAME>]`.
//! - `mets_files`: there are files, each on a physical page, with sane URLs.
//! - `pixel_density`: images have a resolution above 72.
//! - `page`: PAGE-XML texts are consistent (see [`crate::page_validator`]).

use crate::{
    error::ValidatorError,
    page_validator::{PageStrictness, PageValidator},
    report::ValidationReport,
};
use ocrd::{Resolver, Workspace};
use ocrd_models::{FileQuery, OcrdFile};
use ocrd_utils::{
    constants::{DEFAULT_METS_BASENAME, FILE_GROUP_CATEGORIES, FILE_GROUP_PREFIX, MIMETYPE_PAGE},
    str_utils::{abspath, is_local_filename},
};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tracing::{debug, info};

pub const CHECK_UNIQUE_IDENTIFIER: &str = "mets_unique_identifier";
pub const CHECK_FILE_GROUP_NAMES: &str = "mets_file_group_names";
pub const CHECK_FILES: &str = "mets_files";
pub const CHECK_PIXEL_DENSITY: &str = "pixel_density";
pub const CHECK_PAGE: &str = "page";

/// All checks, in the order they run.
pub const CHECKS: &[&str] = &[
    CHECK_UNIQUE_IDENTIFIER,
    CHECK_FILE_GROUP_NAMES,
    CHECK_FILES,
    CHECK_PIXEL_DENSITY,
    CHECK_PAGE,
];

static USE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9-]{3,}$").expect("USE name regex must compile"));

static JAVA_FILE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^file:/[^/]").expect("file URL regex must compile"));

/// Reject names that aren't in [`CHECKS`].
pub fn check_skip_names(skip: &[String]) -> Result<(), ValidatorError> {
    match skip.iter().find(|s| !CHECKS.contains(&s.as_str())) {
        Some(unknown) => Err(ValidatorError::UnknownCheck(unknown.clone())),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Workspace directory. Without a METS URL, `<src_dir>/mets.xml` is used.
    pub src_dir: Option<PathBuf>,
    /// Names of checks to skip.
    pub skip: Vec<String>,
    /// Download remote images for the pixel density check.
    pub download: bool,
    pub page_strictness: PageStrictness,
}

impl ValidatorOptions {
    fn skips(&self, check: &str) -> bool {
        self.skip.iter().any(|s| s == check)
    }
}

pub struct WorkspaceValidator {
    resolver: Resolver,
    mets_url: Option<String>,
    options: ValidatorOptions,
}

impl WorkspaceValidator {
    pub fn new(resolver: Resolver, mets_url: Option<&str>, options: ValidatorOptions) -> Self {
        Self {
            resolver,
            mets_url: mets_url.map(str::to_string),
            options,
        }
    }

    /// Validate the workspace at `mets_url` (or `options.src_dir`).
    pub async fn validate(
        resolver: &Resolver,
        mets_url: Option<&str>,
        options: ValidatorOptions,
    ) -> ValidationReport {
        Self::new(resolver.clone(), mets_url, options).run().await
    }

    /// Run all checks that aren't skipped. Every run starts with a fresh
    /// report and re-reads the workspace.
    pub async fn run(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let Some(mets_url) = self.mets_url() else {
            report.add_error("Failed to instantiate workspace: no METS URL or source directory given");
            return report;
        };
        let mut workspace = match self.open_workspace(&mets_url).await {
            Ok(ws) => ws,
            Err(e) => {
                report.add_error(format!("Failed to instantiate workspace: {e}"));
                return report;
            }
        };
        info!("Validating workspace {}", workspace.directory().display());

        if !self.options.skips(CHECK_UNIQUE_IDENTIFIER) {
            validate_unique_identifier(&workspace, &mut report);
        }
        if !self.options.skips(CHECK_FILE_GROUP_NAMES) {
            validate_file_group_names(&workspace, &mut report);
        }
        if !self.options.skips(CHECK_FILES) {
            validate_files(&workspace, &mut report);
        }
        if !self.options.skips(CHECK_PIXEL_DENSITY) {
            self.validate_pixel_density(&workspace, &mut report).await;
        }
        if !self.options.skips(CHECK_PAGE) {
            self.validate_page(&mut workspace, &mut report).await;
        }
        report
    }

    fn mets_url(&self) -> Option<String> {
        match (&self.mets_url, &self.options.src_dir) {
            (Some(url), _) => Some(url.clone()),
            (None, Some(dir)) => Some(dir.join(DEFAULT_METS_BASENAME).to_string_lossy().to_string()),
            (None, None) => None,
        }
    }

    /// Open local METS files in place; remote ones are cloned first.
    async fn open_workspace(&self, mets_url: &str) -> ocrd::Result<Workspace> {
        if !is_local_filename(mets_url) {
            return self
                .resolver
                .workspace_from_url(mets_url, self.options.src_dir.as_deref(), None)
                .await;
        }
        let mets_path = abspath(mets_url);
        let directory = match &self.options.src_dir {
            Some(dir) => dir.clone(),
            None => mets_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let basename = mets_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        Workspace::new(self.resolver.clone(), directory, basename.as_deref()).await
    }

    async fn validate_pixel_density(&self, workspace: &Workspace, report: &mut ValidationReport) {
        for file in workspace.mets.files().iter().filter(|f| f.is_image()) {
            let Some(url) = file.url.as_deref() else {
                continue;
            };
            if !file.is_local() && !self.options.download {
                report.add_notice(format!("Won't download remote image <{url}>"));
                continue;
            }
            let exif = match workspace.resolve_image_exif(url).await {
                Ok(exif) => exif,
                Err(e) => {
                    report.add_error(format!("Image {}: failed to read resolution: {e}", file.id));
                    continue;
                }
            };
            let axes = [
                ("xResolution", exif.x_resolution, exif.x_ppi()),
                ("yResolution", exif.y_resolution, exif.y_ppi()),
            ];
            for (axis, value, ppi) in axes {
                if ppi.is_none_or(|v| v <= 72.0) {
                    let value = value.map_or_else(|| "unknown".to_string(), |v| v.to_string());
                    report.add_error(format!(
                        "Image {}: {axis} ({value} pixels per {}) is too low",
                        file.id, exif.resolution_unit
                    ));
                }
            }
        }
    }

    async fn validate_page(&self, workspace: &mut Workspace, report: &mut ValidationReport) {
        let query = FileQuery::new().mimetype(MIMETYPE_PAGE).local_only(true);
        let files = match workspace.mets.find_files(&query) {
            Ok(files) => files,
            Err(e) => {
                report.add_error(e.to_string());
                return;
            }
        };
        for file in files {
            let file = match workspace.download_file(&file).await {
                Ok(file) => file,
                Err(e) => {
                    report.add_error(format!("PAGE file {} not available: {e}", file.id));
                    continue;
                }
            };
            let Some(path) = file.local_filename.as_deref() else {
                continue;
            };
            debug!("Validating PAGE {}", path.display());
            report.merge(PageValidator::validate_file(
                path,
                self.options.page_strictness,
                &file.id,
            ));
        }
    }
}

fn validate_unique_identifier(workspace: &Workspace, report: &mut ValidationReport) {
    if workspace.mets.unique_identifier().is_none() {
        report.add_error("METS has no unique identifier");
    }
}

fn validate_file_group_names(workspace: &Workspace, report: &mut ValidationReport) {
    for file_grp in workspace.mets.file_groups() {
        let Some(rest) = file_grp.strip_prefix(FILE_GROUP_PREFIX) else {
            report.add_notice(format!(
                "fileGrp USE does not begin with '{FILE_GROUP_PREFIX}': {file_grp}"
            ));
            continue;
        };
        let (category, name) = match rest.split_once('-') {
            Some((category, name)) => (category, Some(name)),
            None => (rest, None),
        };
        if !FILE_GROUP_CATEGORIES.contains(&category) {
            report.add_error(format!(
                "Unspecified USE category '{category}' in fileGrp '{file_grp}'"
            ));
        }
        if let Some(name) = name
            && !USE_NAME.is_match(name)
        {
            report.add_error(format!("Invalid USE name '{name}' in fileGrp '{file_grp}'"));
        }
    }
}

fn validate_files(workspace: &Workspace, report: &mut ValidationReport) {
    let files = workspace.mets.files();
    if files.is_empty() {
        report.add_error("No files");
    }
    for file in &files {
        if file.group_id.is_some() {
            report.add_notice(format!(
                "File '{}' has GROUPID attribute - document might need an update",
                file.id
            ));
        }
        if file.page_id.is_none() {
            report.add_error(format!(
                "File '{}' does not manifest any physical page.",
                file.id
            ));
        }
        validate_url(file, report);
    }
}

fn validate_url(file: &OcrdFile, report: &mut ValidationReport) {
    let Some(url) = file.url.as_deref() else {
        return;
    };
    if !url.contains(":/") {
        return;
    }
    if JAVA_FILE_URL.is_match(url) {
        report.add_warning(format!(
            "File '{}' has an invalid (Java-specific) file URL '{url}'",
            file.id
        ));
    }
    let scheme = url.split_once(':').map_or("", |(scheme, _)| scheme);
    if !matches!(scheme, "http" | "https" | "file") {
        report.add_warning(format!(
            "File '{}' has non-HTTP, non-file URL '{url}'",
            file.id
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_skip_names() {
        assert!(check_skip_names(&["page".to_string(), "pixel_density".to_string()]).is_ok());
        let err = check_skip_names(&["pages".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown check 'pages'");
    }

    #[test]
    fn test_use_name_pattern() {
        assert!(USE_NAME.is_match("BIN-TESS"));
        assert!(!USE_NAME.is_match("X"));
        assert!(!USE_NAME.is_match("lower"));
    }
}
