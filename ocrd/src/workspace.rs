//! A directory holding a METS file and the files it references.

use crate::{
    error::{OcrdError, Result, io_error},
    resolver::{DownloadOptions, Resolver},
};
use ocrd_models::{MetsError, NewFile, OcrdExif, OcrdFile, OcrdMets};
use ocrd_utils::{
    constants::{DEFAULT_METS_BASENAME, TMP_PREFIX, extension_for_mimetype},
    str_utils::{is_local_filename, url_basename},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Workspace {
    directory: PathBuf,
    mets_basename: String,
    pub mets: OcrdMets,
    resolver: Resolver,
}

impl Workspace {
    /// Open the workspace in `directory`, reading `<directory>/<mets_basename>`.
    pub async fn new(
        resolver: Resolver,
        directory: impl Into<PathBuf>,
        mets_basename: Option<&str>,
    ) -> Result<Self> {
        let directory = directory.into();
        let directory = std::path::absolute(&directory).map_err(io_error(&directory))?;
        let mets_basename = mets_basename.unwrap_or(DEFAULT_METS_BASENAME).to_string();
        let mets = read_mets(&directory.join(&mets_basename)).await?;
        Ok(Self {
            directory,
            mets_basename,
            mets,
            resolver,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn mets_basename(&self) -> &str {
        &self.mets_basename
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Path of the METS file.
    pub fn mets_target(&self) -> PathBuf {
        self.directory.join(&self.mets_basename)
    }

    /// Discard in-memory changes and re-read the METS from disk.
    pub async fn reload_mets(&mut self) -> Result<()> {
        self.mets = read_mets(&self.mets_target()).await?;
        Ok(())
    }

    pub async fn save_mets(&self) -> Result<()> {
        let target = self.mets_target();
        debug!("Saving METS to {}", target.display());
        tokio::fs::write(&target, self.mets.to_xml())
            .await
            .map_err(io_error(&target))
    }

    /// Download `url` into the workspace directory.
    pub async fn download_url(&self, url: &str, options: &DownloadOptions) -> Result<PathBuf> {
        self.resolver
            .download_to_directory(&self.directory, url, options)
            .await
    }

    /// Make `file` available below the workspace directory.
    ///
    /// Files outside the workspace are fetched into `<fileGrp>/` and their
    /// URL in the METS is rewritten to the relative local path. Files already
    /// inside the workspace are left where they are.
    pub async fn download_file(&mut self, file: &OcrdFile) -> Result<OcrdFile> {
        let url = file
            .url
            .as_deref()
            .ok_or_else(|| OcrdError::NoUrl(file.id.clone()))?;
        let mut ret = file.clone();
        let source = match file.local_path(&self.directory) {
            Some(path) if path.starts_with(&self.directory) => {
                ret.local_filename = Some(path);
                return Ok(ret);
            }
            Some(path) => path.to_string_lossy().to_string(),
            None => url.to_string(),
        };
        let options = DownloadOptions::new()
            .subdir(file.file_grp.as_str())
            .basename(url_basename(url));
        let path = self.download_url(&source, &options).await?;
        let relative = path
            .strip_prefix(&self.directory)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.to_string_lossy().to_string());
        info!("Downloaded {} to {relative}", file.id);
        self.mets.set_file_url(&file.id, &relative)?;
        ret.url = Some(relative);
        ret.local_filename = Some(path);
        Ok(ret)
    }

    /// Add a file to the METS, writing `content` (if any) to
    /// `<fileGrp>/<basename>` first.
    ///
    /// The basename is taken from `file.local_filename`, or built from the ID
    /// and the extension for the MIME type.
    pub async fn add_file(
        &mut self,
        file_grp: &str,
        mut file: NewFile,
        content: Option<&[u8]>,
        force: bool,
    ) -> Result<OcrdFile> {
        if !force && self.mets.file_by_id(&file.id).is_some() {
            return Err(MetsError::DuplicateFileId(file.id).into());
        }
        if let Some(content) = content {
            let basename = match file.local_filename.as_deref().and_then(Path::file_name) {
                Some(name) => name.to_string_lossy().to_string(),
                None => {
                    let ext = file
                        .mimetype
                        .as_deref()
                        .and_then(extension_for_mimetype)
                        .unwrap_or("");
                    format!("{}{ext}", file.id)
                }
            };
            let relative = format!("{file_grp}/{basename}");
            let path = self.directory.join(file_grp).join(&basename);
            tokio::fs::create_dir_all(self.directory.join(file_grp))
                .await
                .map_err(io_error(self.directory.join(file_grp)))?;
            tokio::fs::write(&path, content)
                .await
                .map_err(io_error(&path))?;
            debug!("Wrote {} bytes to {}", content.len(), path.display());
            if file.url.is_none() {
                file.url = Some(relative);
            }
            file.local_filename = Some(path);
        }
        Ok(self.mets.add_file(file_grp, file, force)?)
    }

    /// Remove a file from the METS and delete its local copy.
    ///
    /// A file without a local copy is an error unless `force` is set.
    pub async fn remove_file(&mut self, id: &str, force: bool) -> Result<OcrdFile> {
        let file = self
            .mets
            .file_by_id(id)
            .ok_or_else(|| MetsError::FileNotFound(id.to_string()))?;
        let local = file
            .local_path(&self.directory)
            .filter(|p| p.is_file());
        match local {
            Some(path) => {
                info!("Deleting {}", path.display());
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(io_error(&path))?;
            }
            None if force => warn!("File not locally available but force is set: {file}"),
            None => return Err(OcrdError::NotLocallyAvailable(file.to_string())),
        }
        Ok(self.mets.remove_file(id)?)
    }

    /// Image metadata for `url`. Local images are read in place; remote
    /// ones are downloaded to a temporary directory first.
    pub async fn resolve_image_exif(&self, url: &str) -> Result<OcrdExif> {
        if is_local_filename(url) {
            let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.directory.join(path)
            };
            return Ok(OcrdExif::from_path(&path)?);
        }
        let tmp = tempfile::Builder::new()
            .prefix(TMP_PREFIX)
            .tempdir()
            .map_err(io_error(std::env::temp_dir()))?;
        let path = self
            .resolver
            .download_to_directory(tmp.path(), url, &DownloadOptions::new())
            .await?;
        Ok(OcrdExif::from_path(&path)?)
    }
}

async fn read_mets(path: &Path) -> Result<OcrdMets> {
    let xml = tokio::fs::read_to_string(path)
        .await
        .map_err(io_error(path))?;
    Ok(OcrdMets::parse(&xml)?)
}
