//! OCR-D workspaces.
//!
//! A [`Workspace`] is a directory with a METS file. The [`Resolver`] creates
//! workspaces and fetches the files they reference; the
//! [`WorkspaceBagger`] converts workspaces to and from OCRD-ZIP bags.

pub mod config;
pub mod error;
pub mod resolver;
pub mod resolver_cache;
pub mod workspace;
pub mod workspace_bagger;

pub use config::{OcrdConfig, ResolverConfig, ValidationConfig};
pub use error::{OcrdError, Result};
pub use resolver::{DownloadOptions, Resolver};
pub use resolver_cache::ResolverCache;
pub use workspace::Workspace;
pub use workspace_bagger::{BagOptions, ManifestationDepth, WorkspaceBagger};
