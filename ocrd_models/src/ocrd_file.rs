use ocrd_utils::str_utils::is_local_filename;
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Snapshot of one `mets:file`.
///
/// Values are copied out of the document; changes go through
/// [`crate::OcrdMets`] (for instance [`crate::OcrdMets::set_file_url`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrdFile {
    pub id: String,
    pub file_grp: String,
    pub mimetype: Option<String>,
    pub url: Option<String>,
    pub page_id: Option<String>,
    pub group_id: Option<String>,
    /// Where the file lives on disk, if known.
    pub local_filename: Option<PathBuf>,
}

impl OcrdFile {
    /// Local path for a `file://` URL or plain path; relative paths are
    /// resolved against `base` (the workspace directory).
    pub fn local_path(&self, base: &Path) -> Option<PathBuf> {
        let url = self.url.as_deref().filter(|u| is_local_filename(u))?;
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        })
    }

    pub fn is_local(&self) -> bool {
        self.url.as_deref().is_some_and(is_local_filename)
    }

    /// Last path segment of the URL.
    pub fn basename(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(|u| u.rsplit('/').next().unwrap_or(u))
    }

    /// Extension of [`Self::basename`] including the dot, e.g. `.tif`.
    pub fn extension(&self) -> Option<&str> {
        let basename = self.basename()?;
        basename.rfind('.').map(|i| &basename[i..])
    }

    pub fn is_image(&self) -> bool {
        self.mimetype
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
    }
}

impl fmt::Display for OcrdFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OcrdFile[fileGrp={},ID={},mimetype={},url={},pageId={}]",
            self.file_grp,
            self.id,
            self.mimetype.as_deref().unwrap_or("-"),
            self.url.as_deref().unwrap_or("-"),
            self.page_id.as_deref().unwrap_or("-"),
        )
    }
}

/// Data for a file added with [`crate::OcrdMets::add_file`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFile {
    pub id: String,
    pub mimetype: Option<String>,
    pub url: Option<String>,
    pub page_id: Option<String>,
    pub local_filename: Option<PathBuf>,
}

impl NewFile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn local_filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_filename = Some(path.into());
        self
    }
}
