//! # OCR-D Models
//!
//! In-memory models of the documents an OCR-D workspace consists of:
//!
//! - **`xml`**: a small owned XML tree with namespace-aware lookups.
//! - **`ocrd_mets`**: the METS file listing all files, groups and pages.
//! - **`ocrd_file`** / **`ocrd_agent`**: value types for `mets:file` and `mets:agent`.
//! - **`ocrd_exif`**: image size and pixel density from file headers.

pub mod constants;
pub mod error;
pub mod ocrd_agent;
pub mod ocrd_exif;
pub mod ocrd_file;
pub mod ocrd_mets;
pub mod xml;

pub use error::MetsError;
pub use ocrd_agent::OcrdAgent;
pub use ocrd_exif::{ExifError, OcrdExif, ResolutionUnit};
pub use ocrd_file::{NewFile, OcrdFile};
pub use ocrd_mets::{FileQuery, OcrdMets};
