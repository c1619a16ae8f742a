//! # OCRD-ZIP
//!
//! Packs a workspace into a BagIt bag (zipped or as a directory) and unpacks
//! such bags into new workspaces.
//!
//! Bag layout:
//!
//! ```text
//! bagit.txt
//! bag-info.txt
//! manifest-sha512.txt
//! tagmanifest-sha512.txt
//! data/<ocrd_mets>
//! data/<fileGrp>/<ID>
//! ```

use crate::{
    error::{OcrdError, Result, io_error},
    resolver::{DownloadOptions, Resolver},
    workspace::Workspace,
};
use chrono::Local;
use ocrd_utils::constants::{
    BAGIT_TXT, DEFAULT_METS_BASENAME, OCRD_BAGIT_PROFILE_URL, TMP_BAGIT_PREFIX,
};
use sha2::{Digest, Sha512};
use std::{
    fmt,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

pub const BAG_INFO_TXT: &str = "bag-info.txt";
pub const MANIFEST_TXT: &str = "manifest-sha512.txt";
pub const TAGMANIFEST_TXT: &str = "tagmanifest-sha512.txt";

/// Which files a bag carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestationDepth {
    /// Every file, remote ones downloaded.
    #[default]
    Full,
    /// Only files available locally; remote URLs stay as they are.
    Partial,
}

impl FromStr for ManifestationDepth {
    type Err = OcrdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            other => Err(OcrdError::InvalidManifestationDepth(other.to_string())),
        }
    }
}

impl fmt::Display for ManifestationDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Partial => "partial",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagOptions {
    pub ocrd_identifier: String,
    /// Defaults to `<workspace>.ocrd.zip`, or `<workspace>.ocrd` with `skip_zip`.
    pub dest: Option<PathBuf>,
    /// Name of the METS inside `data/`.
    pub ocrd_mets: String,
    pub manifestation_depth: ManifestationDepth,
    pub base_version_checksum: Option<String>,
    /// Leave the bag as a directory instead of zipping it.
    pub skip_zip: bool,
}

impl BagOptions {
    pub fn new(ocrd_identifier: impl Into<String>) -> Self {
        Self {
            ocrd_identifier: ocrd_identifier.into(),
            dest: None,
            ocrd_mets: DEFAULT_METS_BASENAME.to_string(),
            manifestation_depth: ManifestationDepth::Full,
            base_version_checksum: None,
            skip_zip: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceBagger {
    resolver: Resolver,
}

impl WorkspaceBagger {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Bag `workspace` and return the path of the zip file (or directory).
    pub async fn bag(&self, workspace: &Workspace, options: &BagOptions) -> Result<PathBuf> {
        let dest = options
            .dest
            .clone()
            .unwrap_or_else(|| default_dest(workspace.directory(), options.skip_zip));
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Err(OcrdError::DirectoryExists(dest));
        }
        info!(
            "Bagging {} to {} (depth={})",
            workspace.directory().display(),
            dest.display(),
            options.manifestation_depth
        );
        let tmp = tempfile::Builder::new()
            .prefix(TMP_BAGIT_PREFIX)
            .tempdir()
            .map_err(io_error(std::env::temp_dir()))?;
        let bagdir = tmp.path().to_path_buf();
        let data = bagdir.join("data");
        tokio::fs::create_dir_all(&data)
            .await
            .map_err(io_error(&data))?;
        write(&bagdir.join("bagit.txt"), BAGIT_TXT).await?;

        let mut mets = workspace.mets.clone();
        for file in mets.files() {
            if options.manifestation_depth == ManifestationDepth::Partial && !file.is_local() {
                debug!("Not bagging remote file {}", file.id);
                continue;
            }
            let Some(url) = file.url.as_deref() else {
                debug!("Not bagging file {} without URL", file.id);
                continue;
            };
            let source = match file.local_path(workspace.directory()) {
                Some(path) => path.to_string_lossy().to_string(),
                None => url.to_string(),
            };
            let download = DownloadOptions::new()
                .subdir(file.file_grp.as_str())
                .basename(file.id.as_str())
                .prefer_symlink(false);
            workspace
                .resolver()
                .download_to_directory(&data, &source, &download)
                .await?;
            mets.set_file_url(&file.id, &format!("{}/{}", file.file_grp, file.id))?;
        }
        write(&data.join(&options.ocrd_mets), &mets.to_xml()).await?;

        let manifest_dir = bagdir.clone();
        let (total_bytes, total_files) =
            tokio::task::spawn_blocking(move || write_payload_manifest(&manifest_dir)).await??;
        write(
            &bagdir.join(BAG_INFO_TXT),
            &bag_info(options, total_bytes, total_files),
        )
        .await?;
        let manifest_dir = bagdir.clone();
        tokio::task::spawn_blocking(move || write_tag_manifest(&manifest_dir)).await??;

        if options.skip_zip {
            let bagdir = tmp.keep();
            if tokio::fs::rename(&bagdir, &dest).await.is_err() {
                let (from, to) = (bagdir.clone(), dest.clone());
                tokio::task::spawn_blocking(move || copy_tree(&from, &to)).await??;
                tokio::fs::remove_dir_all(&bagdir)
                    .await
                    .map_err(io_error(&bagdir))?;
            }
        } else {
            let to = dest.clone();
            tokio::task::spawn_blocking(move || zip_directory(&bagdir, &to)).await??;
        }
        info!("Created bag at {}", dest.display());
        Ok(dest)
    }

    /// Unpack the bag at `src` into the workspace directory `dest`.
    ///
    /// When `dest` is an existing directory, the workspace goes into a
    /// subdirectory named after `src` without `.ocrd.zip`/`.zip`.
    pub async fn spill(&self, src: &Path, dest: &Path) -> Result<Workspace> {
        let mut dest = dest.to_path_buf();
        if tokio::fs::metadata(&dest).await.is_ok_and(|m| m.is_dir()) {
            dest = dest.join(workspace_name(src));
        }
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Err(OcrdError::DirectoryExists(dest));
        }
        info!("Spilling {} to {}", src.display(), dest.display());

        let tmp = tempfile::Builder::new()
            .prefix(TMP_BAGIT_PREFIX)
            .tempdir()
            .map_err(io_error(std::env::temp_dir()))?;
        let (from, to) = (src.to_path_buf(), tmp.path().to_path_buf());
        tokio::task::spawn_blocking(move || unzip(&from, &to)).await??;

        let ocrd_mets = match tokio::fs::read_to_string(tmp.path().join(BAG_INFO_TXT)).await {
            Ok(text) => parse_bag_info(&text)
                .into_iter()
                .find(|(k, _)| k == "Ocrd-Mets")
                .map(|(_, v)| v),
            Err(_) => None,
        };
        let (from, to) = (tmp.path().join("data"), dest.clone());
        tokio::task::spawn_blocking(move || copy_tree(&from, &to)).await??;
        Workspace::new(self.resolver.clone(), dest, ocrd_mets.as_deref()).await
    }
}

fn default_dest(workspace_dir: &Path, skip_zip: bool) -> PathBuf {
    let suffix = if skip_zip { ".ocrd" } else { ".ocrd.zip" };
    let mut dest = workspace_dir.as_os_str().to_owned();
    dest.push(suffix);
    PathBuf::from(dest)
}

/// Workspace directory name for a bag file: its filename without
/// `.ocrd.zip` or `.zip`.
pub fn workspace_name(src: &Path) -> String {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.strip_suffix(".zip") {
        Some(stem) => stem.strip_suffix(".ocrd").unwrap_or(stem).to_string(),
        None => name,
    }
}

async fn write(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(io_error(path))
}

fn bag_info(options: &BagOptions, total_bytes: u64, total_files: usize) -> String {
    let mut info = vec![
        ("BagIt-Profile-Identifier", OCRD_BAGIT_PROFILE_URL.to_string()),
        ("Bagging-Date", Local::now().format("%Y-%m-%d").to_string()),
        ("Ocrd-Identifier", options.ocrd_identifier.clone()),
        ("Ocrd-Manifestation-Depth", options.manifestation_depth.to_string()),
    ];
    if let Some(checksum) = &options.base_version_checksum {
        info.push(("Ocrd-Base-Version-Checksum", checksum.clone()));
    }
    if options.ocrd_mets != DEFAULT_METS_BASENAME {
        info.push(("Ocrd-Mets", options.ocrd_mets.clone()));
    }
    info.push(("Payload-Oxum", format!("{total_bytes}.{total_files}")));
    info.iter().map(|(k, v)| format!("{k}: {v}\n")).collect()
}

/// Parse `bag-info.txt` into key/value pairs, in file order. Indented lines
/// continue the previous value.
pub fn parse_bag_info(text: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = entries.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            entries.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    entries
}

/// Parse a BagIt manifest into `(checksum, path)` pairs.
pub fn parse_manifest(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (checksum, path) = line.trim_end().split_once(char::is_whitespace)?;
            Some((checksum.to_lowercase(), path.trim_start().to_string()))
        })
        .collect()
}

/// Hex-encoded SHA-512 of a file.
pub fn sha512_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Path of `path` relative to `base`, with `/` separators.
pub fn bag_relative(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| OcrdError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Write `manifest-sha512.txt` for `data/` and return the Payload-Oxum parts.
fn write_payload_manifest(bagdir: &Path) -> Result<(u64, usize)> {
    let mut manifest = String::new();
    let mut total_bytes = 0;
    let files = walk_files(&bagdir.join("data"))?;
    for path in &files {
        let checksum = sha512_file(path).map_err(io_error(path))?;
        total_bytes += std::fs::metadata(path).map_err(io_error(path))?.len();
        manifest.push_str(&format!("{checksum}  {}\n", bag_relative(bagdir, path)));
    }
    let target = bagdir.join(MANIFEST_TXT);
    std::fs::write(&target, manifest).map_err(io_error(&target))?;
    Ok((total_bytes, files.len()))
}

fn write_tag_manifest(bagdir: &Path) -> Result<()> {
    let mut manifest = String::new();
    for name in ["bagit.txt", BAG_INFO_TXT, MANIFEST_TXT] {
        let path = bagdir.join(name);
        let checksum = sha512_file(&path).map_err(io_error(&path))?;
        manifest.push_str(&format!("{checksum}  {name}\n"));
    }
    let target = bagdir.join(TAGMANIFEST_TXT);
    std::fs::write(&target, manifest).map_err(io_error(&target))
}

fn zip_directory(src: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest).map_err(io_error(dest))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| OcrdError::Walk {
            path: src.to_path_buf(),
            source,
        })?;
        let name = bag_relative(src, entry.path());
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut f = File::open(entry.path()).map_err(io_error(entry.path()))?;
            io::copy(&mut f, &mut zip).map_err(io_error(dest))?;
        }
    }
    zip.finish()?;
    Ok(())
}

/// Extract the zip file at `src` into `dest`. A directory `src` is copied.
pub fn unzip(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        return copy_tree(src, dest);
    }
    let file = File::open(src).map_err(io_error(src))?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(dest)?;
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|source| OcrdError::Walk {
            path: src.to_path_buf(),
            source,
        })?;
        let target = dest.join(entry.path().strip_prefix(src).unwrap_or(entry.path()));
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(io_error(&target))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(io_error(&target))?;
        }
    }
    Ok(())
}
