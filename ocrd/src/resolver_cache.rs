//! On-disk cache of downloaded files, keyed by URL.

use crate::{
    config::project_dirs,
    error::{Result, io_error},
};
use ocrd_utils::str_utils::safe_filename;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResolverCache {
    directory: PathBuf,
}

impl ResolverCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// `<user cache dir>/resolver`, or a directory under the system temp dir
    /// when no home directory can be determined.
    pub fn default_directory() -> PathBuf {
        project_dirs()
            .map(|d| d.cache_dir().join("resolver"))
            .unwrap_or_else(|| std::env::temp_dir().join("ocrd-resolver-cache"))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry(&self, url: &str) -> PathBuf {
        self.directory.join(safe_filename(url))
    }

    /// Cached copy of `url`, if any.
    pub async fn get(&self, url: &str) -> Option<PathBuf> {
        let path = self.entry(url);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Store a copy of the file at `src` for `url`.
    pub async fn put_file(&self, url: &str, src: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(io_error(&self.directory))?;
        let path = self.entry(url);
        tokio::fs::copy(src, &path).await.map_err(io_error(&path))?;
        debug!("Cached {url} as {}", path.display());
        Ok(path)
    }

    pub async fn put_bytes(&self, url: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(io_error(&self.directory))?;
        let path = self.entry(url);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(io_error(&path))?;
        debug!("Cached {url} as {}", path.display());
        Ok(path)
    }
}
