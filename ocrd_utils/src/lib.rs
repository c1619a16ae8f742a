//! # OCR-D Utilities
//!
//! Building blocks shared by every crate of the toolkit:
//!
//! - **`constants`**: fileGrp naming, MIME types, temp-directory prefixes.
//! - **`str_utils`**: URL and filename helpers used when resolving files.
//! - **`filter`**: literal-or-regex filters for METS searches.
//! - **`coordinates`**: conversions between PAGE-XML coordinate notations.
//! - **`log_config`**: parsing and checking `ocrd_logging.conf`.
//! - **`logging`**: installing the `tracing` subscriber from that file.

pub mod constants;
pub mod coordinates;
pub mod filter;
pub mod log_config;
pub mod logging;
pub mod str_utils;

pub use filter::StringFilter;
pub use logging::{init_logging, init_test_logging};
