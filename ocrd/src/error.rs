use ocrd_models::{ExifError, MetsError};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = OcrdError> = std::result::Result<T, E>;

/// Errors raised by resolver, workspace and bagger operations.
#[derive(Debug, Error)]
pub enum OcrdError {
    #[error(transparent)]
    Mets(#[from] MetsError),

    #[error(transparent)]
    Exif(#[from] ExifError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {url} (HTTP {status})")]
    DownloadFailed { url: String, status: u16 },

    #[error("Request for <{url}> failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to set up HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Not clobbering existing METS '{0}'")]
    NotClobbering(PathBuf),

    #[error("Directory does not exist or is not a directory: '{0}'")]
    NotADirectory(PathBuf),

    #[error("Directory exists: {0}")]
    DirectoryExists(PathBuf),

    #[error("Unknown file structure convention '{0}'")]
    UnknownConvention(String),

    #[error("manifestation_depth must be 'full' or 'partial', not '{0}'")]
    InvalidManifestationDepth(String),

    #[error("File '{0}' has no URL")]
    NoUrl(String),

    #[error("File not locally available: {0}")]
    NotLocallyAvailable(String),

    #[error("Invalid configuration '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// `map_err` adapter attaching a path to an I/O error.
pub(crate) fn io_error(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> OcrdError {
    let path = path.into();
    move |source| OcrdError::Io { path, source }
}
