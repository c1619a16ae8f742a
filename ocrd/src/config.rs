//! # Configuration
//!
//! Optional `ocrd.toml` settings for the resolver and the validators:
//!
//! ```toml
//! [resolver]
//! cache_enabled = true
//! prefer_symlink = false
//! download_timeout_secs = 60
//!
//! [validation]
//! skip = ["pixel_density"]
//! page_strictness = "lax"
//! ```
//!
//! [`OcrdConfig::discover`] looks in the working directory, then in the
//! user's configuration directory. Missing files mean defaults.

use crate::error::{OcrdError, Result, io_error};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILENAME: &str = "ocrd.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrdConfig {
    pub resolver: ResolverConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Keep downloaded files in a local cache keyed by URL.
    pub cache_enabled: bool,
    /// Symlink local and cached files instead of copying them.
    pub prefer_symlink: bool,
    /// Defaults to the user cache directory.
    pub cache_directory: Option<PathBuf>,
    pub download_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_enabled: false,
            prefer_symlink: false,
            cache_directory: None,
            download_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Workspace checks skipped unless requested otherwise.
    pub skip: Vec<String>,
    pub page_strictness: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            skip: Vec::new(),
            page_strictness: "strict".to_string(),
        }
    }
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "OCR-D", "ocrd")
}

impl OcrdConfig {
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| OcrdError::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(io_error(path))?;
        Self::parse(&text, path)
    }

    /// Candidate config files, in lookup order.
    pub fn search_path(cwd: Option<&Path>, config_dir: Option<&Path>) -> Vec<PathBuf> {
        cwd.into_iter()
            .chain(config_dir)
            .map(|dir| dir.join(CONFIG_FILENAME))
            .collect()
    }

    /// Load the first config file found, or defaults.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().ok();
        let dirs = project_dirs();
        let candidates = Self::search_path(cwd.as_deref(), dirs.as_ref().map(|d| d.config_dir()));
        match candidates.into_iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}
