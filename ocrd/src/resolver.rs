//! # Resolver
//!
//! Fetches files into workspaces and creates workspaces from a METS URL, an
//! empty template, or a folder of images and PAGE files.
//!
//! Local sources (`file://` URLs or plain paths) are copied, or symlinked
//! when symlinks are preferred. Remote sources are fetched with `reqwest`.
//! With the cache enabled, every download is remembered by URL and served
//! from the cache next time.

use crate::{
    config::ResolverConfig,
    error::{OcrdError, Result, io_error},
    resolver_cache::ResolverCache,
    workspace::Workspace,
};
use ocrd_models::{NewFile, OcrdMets};
use ocrd_utils::{
    constants::{DEFAULT_METS_BASENAME, MIMETYPE_ALTO, TMP_PREFIX, mimetype_for_filename},
    str_utils::{abspath, is_local_filename, safe_filename, url_basename},
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Folder layout understood by [`Resolver::add_files_to_mets`].
pub const CONVENTION_OCRD_GT: &str = "ocrd-gt";

/// How [`Resolver::download_to_directory`] names and places its result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Target filename. Defaults to the last URL segment with `subdir`,
    /// and to `safe_filename(url)` without.
    pub basename: Option<String>,
    /// Replace an existing target instead of returning it.
    pub overwrite: bool,
    /// Subdirectory of the target directory.
    pub subdir: Option<String>,
    /// Overrides [`ResolverConfig::prefer_symlink`].
    pub prefer_symlink: Option<bool>,
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    pub fn prefer_symlink(mut self, prefer_symlink: bool) -> Self {
        self.prefer_symlink = Some(prefer_symlink);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
    cache: Option<ResolverCache>,
    client: reqwest::Client,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(concat!("ocrd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(OcrdError::HttpClient)?;
        let cache = config.cache_enabled.then(|| {
            ResolverCache::new(
                config
                    .cache_directory
                    .clone()
                    .unwrap_or_else(ResolverCache::default_directory),
            )
        });
        Ok(Self {
            config,
            cache,
            client,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&ResolverCache> {
        self.cache.as_ref()
    }

    /// Download or copy `url` into `directory` and return the local path.
    pub async fn download_to_directory(
        &self,
        directory: &Path,
        url: &str,
        options: &DownloadOptions,
    ) -> Result<PathBuf> {
        let prefer_symlink = options.prefer_symlink.unwrap_or(self.config.prefer_symlink);
        let basename = match (&options.basename, &options.subdir) {
            (Some(basename), _) => basename.clone(),
            (None, Some(_)) => url_basename(url).to_string(),
            (None, None) => safe_filename(url),
        };
        let target_dir = match &options.subdir {
            Some(subdir) => directory.join(subdir),
            None => directory.to_path_buf(),
        };
        let outfile = target_dir.join(&basename);
        debug!(
            "directory={} url={url} basename={basename} overwrite={} prefer_symlink={prefer_symlink}",
            directory.display(),
            options.overwrite
        );

        if exists(&outfile).await {
            if !options.overwrite {
                debug!("File already exists and overwrite=false: {}", outfile.display());
                return Ok(outfile);
            }
            if is_local_filename(url) && same_file(&abspath(url), &outfile).await {
                return Ok(outfile);
            }
            tokio::fs::remove_file(&outfile)
                .await
                .map_err(io_error(&outfile))?;
        }
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(io_error(&target_dir))?;

        if let Some(cache) = &self.cache
            && let Some(cached) = cache.get(url).await
        {
            debug!("Found cached version of <{url}> at {}", cached.display());
            copy_or_symlink(&cached, &outfile, prefer_symlink).await?;
            return Ok(outfile);
        }

        if is_local_filename(url) {
            let src = abspath(url);
            debug!("Local source {} -> {}", src.display(), outfile.display());
            copy_or_symlink(&src, &outfile, prefer_symlink).await?;
            if let Some(cache) = &self.cache {
                cache.put_file(url, &src).await?;
            }
        } else {
            let bytes = self.fetch(url).await?;
            tokio::fs::write(&outfile, &bytes)
                .await
                .map_err(io_error(&outfile))?;
            if let Some(cache) = &self.cache {
                cache.put_bytes(url, &bytes).await?;
            }
        }
        Ok(outfile)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = url::Url::parse(url).map_err(|source| OcrdError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        info!("Downloading <{url}>");
        let http_err = |source| OcrdError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(parsed).send().await.map_err(http_err)?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(OcrdError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await.map_err(http_err)?.to_vec())
    }

    /// Create a workspace by downloading the METS at `mets_url` into
    /// `directory` (a fresh temporary directory when `None`).
    pub async fn workspace_from_url(
        &self,
        mets_url: &str,
        directory: Option<&Path>,
        mets_basename: Option<&str>,
    ) -> Result<Workspace> {
        let mets_basename = mets_basename.unwrap_or(DEFAULT_METS_BASENAME);
        let directory = prepare_directory(directory).await?;
        info!(
            "Cloning workspace from <{mets_url}> into {}",
            directory.display()
        );
        let options = DownloadOptions::new()
            .basename(mets_basename)
            .prefer_symlink(false);
        self.download_to_directory(&directory, mets_url, &options)
            .await?;
        Workspace::new(self.clone(), directory, Some(mets_basename)).await
    }

    /// Create a workspace with an empty METS.
    pub async fn workspace_from_nothing(
        &self,
        directory: Option<&Path>,
        mets_basename: Option<&str>,
        clobber: bool,
    ) -> Result<Workspace> {
        let mets_basename = mets_basename.unwrap_or(DEFAULT_METS_BASENAME);
        let directory = prepare_directory(directory).await?;
        let mets_path = directory.join(mets_basename);
        if exists(&mets_path).await && !clobber {
            return Err(OcrdError::NotClobbering(mets_path));
        }
        let mets = OcrdMets::empty_mets(None)?;
        tokio::fs::write(&mets_path, mets.to_xml())
            .await
            .map_err(io_error(&mets_path))?;
        info!("Created empty METS at {}", mets_path.display());
        Workspace::new(self.clone(), directory, Some(mets_basename)).await
    }

    /// Create a workspace from the files already in `directory`.
    pub async fn workspace_from_folder(
        &self,
        directory: &Path,
        clobber: bool,
        convention: &str,
    ) -> Result<Workspace> {
        if !tokio::fs::metadata(directory)
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return Err(OcrdError::NotADirectory(directory.to_path_buf()));
        }
        let directory = abspath(&directory.to_string_lossy());
        let mets_path = directory.join(DEFAULT_METS_BASENAME);
        if exists(&mets_path).await && !clobber {
            return Err(OcrdError::NotClobbering(mets_path));
        }
        let mut mets = OcrdMets::empty_mets(None)?;
        Self::add_files_to_mets(convention, &mut mets, &directory)?;
        tokio::fs::write(&mets_path, mets.to_xml())
            .await
            .map_err(io_error(&mets_path))?;
        Workspace::new(self.clone(), directory, None).await
    }

    /// Register the files of `directory` in `mets` following `convention`.
    ///
    /// For `ocrd-gt`, files directly in `directory` go to `OCR-D-IMG`, files
    /// in `page/` to `OCR-D-OCR-PAGE`, files in `alto/` to `OCR-D-OCR-ALTO`
    /// and files in any other subfolder to the uppercased folder name.
    /// Deeper levels are ignored.
    pub fn add_files_to_mets(convention: &str, mets: &mut OcrdMets, directory: &Path) -> Result<()> {
        if convention != CONVENTION_OCRD_GT {
            return Err(OcrdError::UnknownConvention(convention.to_string()));
        }
        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|source| OcrdError::Walk {
                path: directory.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().to_string();
            let folder = match entry.depth() {
                1 => None,
                _ => entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().to_string()),
            };
            if folder.is_none() && filename == DEFAULT_METS_BASENAME {
                continue;
            }
            let Some(mut mimetype) = mimetype_for_filename(&filename) else {
                warn!("Skipping {}: unknown file extension", entry.path().display());
                continue;
            };
            let file_grp = match folder.as_deref() {
                None => "OCR-D-IMG".to_string(),
                Some("page") => "OCR-D-OCR-PAGE".to_string(),
                Some("alto") => {
                    mimetype = MIMETYPE_ALTO;
                    "OCR-D-OCR-ALTO".to_string()
                }
                Some(other) => other.to_uppercase(),
            };
            let id = format!("{file_grp}_{}", filename.replace('.', "_")).to_uppercase();
            let url = format!("file://{}", entry.path().display());
            debug!("Adding {id} ({mimetype}) to {file_grp}");
            mets.add_file(
                &file_grp,
                NewFile::new(id)
                    .mimetype(mimetype)
                    .url(url)
                    .local_filename(entry.path()),
                false,
            )?;
        }
        Ok(())
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `directory` created if missing, or a new temporary directory.
async fn prepare_directory(directory: Option<&Path>) -> Result<PathBuf> {
    match directory {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
            Ok(abspath(&dir.to_string_lossy()))
        }
        None => {
            let tmp = tempfile::Builder::new()
                .prefix(TMP_PREFIX)
                .tempdir()
                .map_err(io_error(std::env::temp_dir()))?;
            Ok(tmp.keep())
        }
    }
}

async fn copy_or_symlink(src: &Path, dst: &Path, prefer_symlink: bool) -> Result<()> {
    if prefer_symlink {
        #[cfg(unix)]
        {
            return tokio::fs::symlink(src, dst).await.map_err(io_error(dst));
        }
    }
    tokio::fs::copy(src, dst).await.map_err(io_error(src))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrd_utils::constants::MIMETYPE_PAGE;
    use tempfile::TempDir;

    fn resolver() -> Resolver {
        Resolver::new(ResolverConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_download_local_file_with_subdir() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("page.xml");
        std::fs::write(&src, "<x/>").unwrap();

        let url = format!("file://{}", src.display());
        let out = resolver()
            .download_to_directory(dst_dir.path(), &url, &DownloadOptions::new().subdir("OCR-D-GT"))
            .await
            .unwrap();
        assert_eq!(out, dst_dir.path().join("OCR-D-GT").join("page.xml"));
        assert_eq!(std::fs::read_to_string(out).unwrap(), "<x/>");
    }

    #[tokio::test]
    async fn test_download_default_basename_is_safe() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("a b.txt");
        std::fs::write(&src, "x").unwrap();

        let url = src.to_string_lossy().to_string();
        let out = resolver()
            .download_to_directory(dst_dir.path(), &url, &DownloadOptions::new())
            .await
            .unwrap();
        assert_eq!(out.file_name().unwrap().to_string_lossy(), safe_filename(&url));
    }

    #[tokio::test]
    async fn test_existing_target_kept_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, "new").unwrap();
        std::fs::write(dir.path().join("dst.txt"), "old").unwrap();

        let r = resolver();
        let url = src.to_string_lossy().to_string();
        let opts = DownloadOptions::new().basename("dst.txt");
        let out = r.download_to_directory(dir.path(), &url, &opts).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "old");

        let out = r
            .download_to_directory(dir.path(), &url, &opts.overwrite(true))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "new");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prefer_symlink() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, "x").unwrap();
        let out = resolver()
            .download_to_directory(
                dir.path(),
                &src.to_string_lossy(),
                &DownloadOptions::new().basename("link.txt").prefer_symlink(true),
            )
            .await
            .unwrap();
        assert!(std::fs::symlink_metadata(&out).unwrap().file_type().is_symlink());
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_downloads() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, "first").unwrap();
        let r = Resolver::new(ResolverConfig {
            cache_enabled: true,
            cache_directory: Some(dir.path().join("cache")),
            ..ResolverConfig::default()
        })
        .unwrap();
        let url = src.to_string_lossy().to_string();
        r.download_to_directory(&dir.path().join("a"), &url, &DownloadOptions::new())
            .await
            .unwrap();
        std::fs::write(&src, "second").unwrap();
        let out = r
            .download_to_directory(&dir.path().join("b"), &url, &DownloadOptions::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "first");
    }

    #[tokio::test]
    async fn test_invalid_remote_url() {
        let dir = TempDir::new().unwrap();
        let err = resolver()
            .download_to_directory(dir.path(), "http://", &DownloadOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OcrdError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_workspace_from_nothing_refuses_to_clobber() {
        let dir = TempDir::new().unwrap();
        let r = resolver();
        let ws = r
            .workspace_from_nothing(Some(dir.path()), None, false)
            .await
            .unwrap();
        assert!(ws.mets_target().exists());
        let err = r
            .workspace_from_nothing(Some(dir.path()), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrdError::NotClobbering(_)));
        assert!(r.workspace_from_nothing(Some(dir.path()), None, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_workspace_from_nothing_in_temp_dir() {
        let ws = resolver()
            .workspace_from_nothing(None, Some("other.xml"), false)
            .await
            .unwrap();
        let dir_name = ws.directory().file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.starts_with(TMP_PREFIX));
        assert!(ws.directory().join("other.xml").exists());
        std::fs::remove_dir_all(ws.directory()).unwrap();
    }

    #[tokio::test]
    async fn test_workspace_from_url_copies_mets() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let r = resolver();
        let ws = r.workspace_from_nothing(Some(src.path()), None, false).await.unwrap();
        let url = ws.mets_target().to_string_lossy().to_string();

        let clone = r
            .workspace_from_url(&url, Some(dst.path().join("clone").as_path()), None)
            .await
            .unwrap();
        assert_eq!(clone.mets_target(), dst.path().join("clone").join("mets.xml"));
        assert!(!std::fs::symlink_metadata(clone.mets_target()).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_add_files_to_mets_ocrd_gt() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("0001.tif"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("page")).unwrap();
        std::fs::write(dir.path().join("page/0001.xml"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("alto")).unwrap();
        std::fs::write(dir.path().join("alto/0001.xml"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("bin/deeper")).unwrap();
        std::fs::write(dir.path().join("bin/0001.png"), "").unwrap();
        std::fs::write(dir.path().join("bin/deeper/0002.png"), "").unwrap();
        std::fs::write(dir.path().join("README"), "").unwrap();

        let mut mets = OcrdMets::empty_mets(None).unwrap();
        Resolver::add_files_to_mets(CONVENTION_OCRD_GT, &mut mets, dir.path()).unwrap();

        let mut groups = mets.file_groups();
        groups.sort();
        assert_eq!(groups, vec!["BIN", "OCR-D-IMG", "OCR-D-OCR-ALTO", "OCR-D-OCR-PAGE"]);

        let img = mets.file_by_id("OCR-D-IMG_0001_TIF").unwrap();
        assert_eq!(img.mimetype.as_deref(), Some("image/tiff"));
        assert!(img.url.unwrap().starts_with("file://"));
        let alto = mets.file_by_id("OCR-D-OCR-ALTO_0001_XML").unwrap();
        assert_eq!(alto.mimetype.as_deref(), Some(MIMETYPE_ALTO));
        let page = mets.file_by_id("OCR-D-OCR-PAGE_0001_XML").unwrap();
        assert_eq!(page.mimetype.as_deref(), Some(MIMETYPE_PAGE));
        assert!(mets.file_by_id("BIN_0001_PNG").is_some());
        assert_eq!(mets.files().len(), 4);
    }

    #[test]
    fn test_unknown_convention() {
        let dir = TempDir::new().unwrap();
        let mut mets = OcrdMets::empty_mets(None).unwrap();
        let err = Resolver::add_files_to_mets("flat", &mut mets, dir.path()).unwrap_err();
        assert!(matches!(err, OcrdError::UnknownConvention(_)));
    }

    #[tokio::test]
    async fn test_workspace_from_folder() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("0001.png"), "").unwrap();
        let r = resolver();
        let ws = r
            .workspace_from_folder(dir.path(), false, CONVENTION_OCRD_GT)
            .await
            .unwrap();
        assert_eq!(ws.mets.file_groups(), vec!["OCR-D-IMG"]);
        let err = r
            .workspace_from_folder(dir.path(), false, CONVENTION_OCRD_GT)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrdError::NotClobbering(_)));
        let err = r
            .workspace_from_folder(&dir.path().join("missing"), false, CONVENTION_OCRD_GT)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrdError::NotADirectory(_)));
    }
}
