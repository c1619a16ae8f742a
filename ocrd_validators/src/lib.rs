//! # OCR-D Validators
//!
//! All validators collect their findings in a [`ValidationReport`] instead
//! of failing on the first problem.
//!
//! - [`WorkspaceValidator`]: METS conventions, files and image resolution.
//! - [`PageValidator`]: PAGE-XML text consistency.
//! - [`OcrdZipValidator`]: OCRD-ZIP bags.

pub mod error;
pub mod ocrd_zip_validator;
pub mod page_validator;
pub mod report;
pub mod workspace_validator;

pub use error::ValidatorError;
pub use ocrd_zip_validator::OcrdZipValidator;
pub use page_validator::{PageStrictness, PageValidator};
pub use report::ValidationReport;
pub use workspace_validator::{CHECKS, ValidatorOptions, WorkspaceValidator, check_skip_names};
