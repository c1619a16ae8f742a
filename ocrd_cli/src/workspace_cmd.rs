use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand, ValueEnum};
use ocrd::{DownloadOptions, OcrdConfig, Resolver, Workspace};
use ocrd_models::{FileQuery, NewFile, OcrdFile};
use ocrd_utils::{
    constants::{DEFAULT_METS_BASENAME, mimetype_for_filename},
    str_utils::is_local_filename,
};
use ocrd_validators::{PageStrictness, ValidatorOptions, WorkspaceValidator, check_skip_names};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    /// Workspace directory.
    #[arg(short = 'd', long, default_value = ".")]
    directory: PathBuf,

    /// Basename of the METS file.
    #[arg(short = 'M', long, default_value = DEFAULT_METS_BASENAME)]
    mets_basename: String,

    #[command(subcommand)]
    command: WorkspaceCommand,
}

#[derive(Subcommand, Debug)]
enum WorkspaceCommand {
    /// Create a workspace with an empty METS.
    Init {
        /// Overwrite an existing METS.
        #[arg(long)]
        clobber_mets: bool,
    },

    /// Create a workspace from a METS URL.
    Clone {
        mets_url: String,
        /// Target directory (defaults to a new temporary directory).
        workspace_dir: Option<PathBuf>,
        /// Download all files as well.
        #[arg(short = 'a', long)]
        download: bool,
    },

    /// Validate the workspace.
    Validate {
        /// METS to validate (defaults to the workspace's METS).
        mets_url: Option<String>,
        /// Checks to skip; may be repeated.
        #[arg(long = "skip")]
        skip: Vec<String>,
        /// Download remote images for checking pixel density.
        #[arg(short = 'a', long)]
        download: bool,
        /// strict, lax, fix or off.
        #[arg(long)]
        page_strictness: Option<String>,
    },

    /// Add a file to the METS, copying it into the workspace if needed.
    Add {
        #[arg(short = 'G', long)]
        file_grp: String,
        #[arg(short = 'i', long)]
        file_id: String,
        /// Guessed from the file extension if omitted.
        #[arg(short = 'm', long)]
        mimetype: Option<String>,
        #[arg(short = 'g', long)]
        page_id: Option<String>,
        /// Replace an existing file with the same ID.
        #[arg(long)]
        force: bool,
        /// Local path or remote URL.
        fname: String,
    },

    /// Find files. Filters starting with `//` are regular expressions.
    Find {
        #[arg(short = 'G', long)]
        file_grp: Option<String>,
        #[arg(short = 'i', long)]
        file_id: Option<String>,
        #[arg(short = 'm', long)]
        mimetype: Option<String>,
        /// Comma-separated page IDs.
        #[arg(short = 'g', long)]
        page_id: Option<String>,
        #[arg(short = 'u', long)]
        url: Option<String>,
        /// Fields to print, tab-separated; may be repeated.
        #[arg(short = 'k', long = "output-field", value_enum, default_value = "url")]
        output_field: Vec<FileField>,
        /// Download matching files into the workspace.
        #[arg(long)]
        download: bool,
    },

    /// Remove files from the METS and the workspace.
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Remove even if the file isn't available locally.
        #[arg(long)]
        force: bool,
    },

    /// Remove file groups.
    RemoveGroup {
        #[arg(required = true)]
        groups: Vec<String>,
        /// Remove the groups' files too.
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// List file groups.
    ListGroup,

    /// List physical pages.
    ListPage,

    /// Print the unique identifier.
    GetId,

    /// Set the unique identifier.
    SetId { id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FileField {
    Url,
    Mimetype,
    PageId,
    FileGrp,
    #[value(name = "ID")]
    Id,
}

impl FileField {
    fn of(self, file: &OcrdFile) -> &str {
        match self {
            FileField::Url => file.url.as_deref().unwrap_or(""),
            FileField::Mimetype => file.mimetype.as_deref().unwrap_or(""),
            FileField::PageId => file.page_id.as_deref().unwrap_or(""),
            FileField::FileGrp => &file.file_grp,
            FileField::Id => &file.id,
        }
    }
}

pub async fn run(args: WorkspaceArgs, config: &OcrdConfig) -> Result<ExitCode> {
    let WorkspaceArgs {
        directory,
        mets_basename,
        command,
    } = args;
    let resolver = Resolver::new(config.resolver.clone())?;
    let open = || open_workspace(&resolver, &directory, &mets_basename);

    match command {
        WorkspaceCommand::Init { clobber_mets } => {
            let ws = resolver
                .workspace_from_nothing(Some(directory.as_path()), Some(mets_basename.as_str()), clobber_mets)
                .await?;
            println!("{}", ws.directory().display());
        }
        WorkspaceCommand::Clone {
            mets_url,
            workspace_dir,
            download,
        } => {
            let mut ws = resolver
                .workspace_from_url(&mets_url, workspace_dir.as_deref(), Some(mets_basename.as_str()))
                .await?;
            if download {
                for file in ws.mets.files() {
                    if file.url.is_some() {
                        ws.download_file(&file).await?;
                    }
                }
                ws.save_mets().await?;
            }
            println!("{}", ws.directory().display());
        }
        WorkspaceCommand::Validate {
            mets_url,
            skip,
            download,
            page_strictness,
        } => {
            let mut all_skips = config.validation.skip.clone();
            all_skips.extend(skip);
            check_skip_names(&all_skips)?;
            let page_strictness: PageStrictness = page_strictness
                .as_deref()
                .unwrap_or(&config.validation.page_strictness)
                .parse()?;
            let mets_url = mets_url.unwrap_or_else(|| {
                directory
                    .join(&mets_basename)
                    .to_string_lossy()
                    .to_string()
            });
            let options = ValidatorOptions {
                src_dir: Some(directory.clone()),
                skip: all_skips,
                download,
                page_strictness,
            };
            let report = WorkspaceValidator::validate(&resolver, Some(mets_url.as_str()), options).await;
            println!("{report}");
            if !report.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
        WorkspaceCommand::Add {
            file_grp,
            file_id,
            mimetype,
            page_id,
            force,
            fname,
        } => {
            let mut ws = open().await?;
            let mimetype = match mimetype {
                Some(m) => m,
                None => mimetype_for_filename(&fname)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("Cannot guess MIME type of '{fname}', use --mimetype"))?,
            };
            let url = if is_local_filename(&fname) {
                local_url(&ws, &file_grp, &fname).await?
            } else {
                fname
            };
            let mut file = NewFile::new(file_id).mimetype(mimetype).url(url);
            if let Some(page_id) = page_id {
                file = file.page_id(page_id);
            }
            let added = ws.add_file(&file_grp, file, None, force).await?;
            info!("Added {added}");
            ws.save_mets().await?;
        }
        WorkspaceCommand::Find {
            file_grp,
            file_id,
            mimetype,
            page_id,
            url,
            output_field,
            download,
        } => {
            let mut ws = open().await?;
            let query = FileQuery {
                id: file_id,
                file_grp,
                page_id,
                mimetype,
                url,
                local_only: false,
            };
            let mut modified = false;
            for file in ws.mets.find_files(&query)? {
                let file = if download && file.url.is_some() {
                    modified = true;
                    ws.download_file(&file).await?
                } else {
                    file
                };
                let fields: Vec<&str> = output_field.iter().map(|f| f.of(&file)).collect();
                println!("{}", fields.join("\t"));
            }
            if modified {
                ws.save_mets().await?;
            }
        }
        WorkspaceCommand::Remove { ids, force } => {
            let mut ws = open().await?;
            for id in &ids {
                ws.remove_file(id, force).await?;
            }
            ws.save_mets().await?;
        }
        WorkspaceCommand::RemoveGroup { groups, recursive } => {
            let mut ws = open().await?;
            for group in &groups {
                ws.mets.remove_file_group(group, recursive)?;
            }
            ws.save_mets().await?;
        }
        WorkspaceCommand::ListGroup => {
            for group in open().await?.mets.file_groups() {
                println!("{group}");
            }
        }
        WorkspaceCommand::ListPage => {
            for page in open().await?.mets.physical_pages() {
                println!("{page}");
            }
        }
        WorkspaceCommand::GetId => {
            if let Some(id) = open().await?.mets.unique_identifier() {
                println!("{id}");
            }
        }
        WorkspaceCommand::SetId { id } => {
            let mut ws = open().await?;
            ws.mets.set_unique_identifier(&id);
            ws.save_mets().await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn open_workspace(resolver: &Resolver, directory: &Path, mets_basename: &str) -> Result<Workspace> {
    Workspace::new(resolver.clone(), directory, Some(mets_basename))
        .await
        .with_context(|| format!("Opening workspace in {}", directory.display()))
}

/// URL for a local file added to the workspace, relative to the workspace
/// directory. Files outside the workspace are copied into `<fileGrp>/`.
async fn local_url(ws: &Workspace, file_grp: &str, fname: &str) -> Result<String> {
    let path = std::path::absolute(fname.strip_prefix("file://").unwrap_or(fname))
        .with_context(|| format!("Resolving {fname}"))?;
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    let path = if path.starts_with(ws.directory()) {
        path
    } else {
        debug!("{} is not in the workspace, copying", path.display());
        let options = DownloadOptions::new().subdir(file_grp);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("No file name in '{fname}'"))?;
        ws.download_url(&path.to_string_lossy(), &options.basename(name))
            .await?
    };
    let relative = path.strip_prefix(ws.directory()).unwrap_or(&path);
    Ok(relative.to_string_lossy().replace('\\', "/"))
}
