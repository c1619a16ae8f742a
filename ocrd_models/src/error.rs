use crate::xml::XmlError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`crate::OcrdMets`] operations.
#[derive(Debug, Error)]
pub enum MetsError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("Failed to read METS '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a METS document: root element is '{0}'")]
    NotMets(String),

    #[error("Invalid filter '{expr}': {source}")]
    InvalidFilter {
        expr: String,
        #[source]
        source: regex::Error,
    },

    #[error("find_files does not support regex search for pageId")]
    PageIdRegex,

    #[error("fileGrp must not contain commas: '{0}'")]
    FileGrpComma(String),

    #[error("Must set ID of the mets:file")]
    MissingFileId,

    #[error("File with ID='{0}' already exists")]
    DuplicateFileId(String),

    #[error("No fileSec!")]
    NoFileSec,

    #[error("No such fileGrp: {0}")]
    NoSuchFileGrp(String),

    #[error("fileGrp {0} is not empty and recursive wasn't set")]
    FileGrpNotEmpty(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}
