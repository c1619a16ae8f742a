//! # Shared Constants
//!
//! Names, prefixes and lookup tables used across the OCR-D crates. Keeping them
//! here means the resolver, the bagger and the validators agree on the same
//! spelling of fileGrp prefixes, MIME types and temp-directory names.

/// Version of the toolkit, embedded in newly created METS headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter values starting with this prefix are treated as regular expressions.
pub const REGEX_PREFIX: &str = "//";

/// Prefix for temporary workspace directories.
pub const TMP_PREFIX: &str = "ocrd-core-";

/// Prefix for temporary BagIt directories.
pub const TMP_BAGIT_PREFIX: &str = "ocrd-bagit-";

/// Default basename of the METS file inside a workspace.
pub const DEFAULT_METS_BASENAME: &str = "mets.xml";

/// Name of the logging configuration file looked up by the search order.
pub const LOG_CONFIG_FILENAME: &str = "ocrd_logging.conf";

/// System-wide directory consulted last for configuration files.
pub const SYSTEM_CONFIG_DIR: &str = "/etc";

/// MIME type of PAGE-XML documents.
pub const MIMETYPE_PAGE: &str = "application/vnd.prima.page+xml";

/// MIME type of ALTO documents.
pub const MIMETYPE_ALTO: &str = "application/alto+xml";

/// BagIt profile an OCRD-ZIP declares conformance to.
pub const OCRD_BAGIT_PROFILE_URL: &str = "https://ocr-d.github.io/bagit-profile.json";

/// Content of `bagit.txt` in every OCRD-ZIP.
pub const BAGIT_TXT: &str = "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n";

/// Every OCR-D fileGrp `USE` starts with this.
pub const FILE_GROUP_PREFIX: &str = "OCR-D-";

/// Categories allowed right after [`FILE_GROUP_PREFIX`].
pub const FILE_GROUP_CATEGORIES: &[&str] = &[
    "IMG", "SEG", "DEWARP", "DESKEW", "BIN", "CROP", "OCR", "COR", "GT",
];

/// File extension to MIME type, as used when building a METS from a folder.
pub const EXT_TO_MIME: &[(&str, &str)] = &[
    (".tif", "image/tiff"),
    (".tiff", "image/tiff"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".jp2", "image/jp2"),
    (".xml", MIMETYPE_PAGE),
    (".json", "application/json"),
    (".txt", "text/plain"),
];

/// MIME type to preferred file extension.
pub const MIME_TO_EXT: &[(&str, &str)] = &[
    ("image/tiff", ".tif"),
    ("image/tif", ".tif"),
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/jp2", ".jp2"),
    (MIMETYPE_PAGE, ".xml"),
    (MIMETYPE_ALTO, ".xml"),
    ("application/json", ".json"),
    ("text/plain", ".txt"),
];

/// Look up the MIME type for a filename by its extension (case-insensitive).
pub fn mimetype_for_filename(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    EXT_TO_MIME
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, mime)| *mime)
}

/// Look up the preferred extension for a MIME type.
pub fn extension_for_mimetype(mimetype: &str) -> Option<&'static str> {
    MIME_TO_EXT
        .iter()
        .find(|(mime, _)| *mime == mimetype)
        .map(|(_, ext)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mimetype_for_filename() {
        assert_eq!(mimetype_for_filename("FILE_0001.TIF"), Some("image/tiff"));
        assert_eq!(mimetype_for_filename("page.xml"), Some(MIMETYPE_PAGE));
        assert_eq!(mimetype_for_filename("README"), None);
    }

    #[test]
    fn test_extension_for_mimetype() {
        assert_eq!(extension_for_mimetype("image/png"), Some(".png"));
        assert_eq!(extension_for_mimetype("application/x-unknown"), None);
    }
}
