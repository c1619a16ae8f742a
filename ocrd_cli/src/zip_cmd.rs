use anyhow::{Context, Result};
use clap::Subcommand;
use ocrd::{BagOptions, ManifestationDepth, OcrdConfig, Resolver, Workspace, WorkspaceBagger};
use ocrd_utils::constants::DEFAULT_METS_BASENAME;
use ocrd_validators::OcrdZipValidator;
use std::{path::PathBuf, process::ExitCode};

#[derive(Subcommand, Debug)]
pub enum ZipCommand {
    /// Bag a workspace as OCRD-ZIP.
    Bag {
        /// Workspace directory.
        #[arg(short = 'd', long, default_value = ".")]
        directory: PathBuf,
        /// Basename of the workspace's METS file.
        #[arg(short = 'M', long, default_value = DEFAULT_METS_BASENAME)]
        mets_basename: String,
        /// Ocrd-Identifier of the bag.
        #[arg(short = 'i', long)]
        identifier: String,
        /// Path of the result (default: <directory>.ocrd.zip).
        #[arg(short = 'D', long)]
        dest: Option<PathBuf>,
        /// Name of the METS inside the bag.
        #[arg(short = 'm', long, default_value = DEFAULT_METS_BASENAME)]
        ocrd_mets: String,
        #[arg(long)]
        base_version_checksum: Option<String>,
        /// full: download all files; partial: only local files.
        #[arg(long, default_value = "full", value_parser = ["full", "partial"])]
        manifestation_depth: String,
        /// Leave the bag as a directory.
        #[arg(short = 'Z', long)]
        skip_zip: bool,
    },

    /// Unpack an OCRD-ZIP into a workspace.
    Spill {
        src: PathBuf,
        /// Target directory. An existing directory gets a subdirectory named after SRC.
        #[arg(default_value = ".")]
        dest: PathBuf,
    },

    /// Validate an OCRD-ZIP (zip file or unpacked directory).
    Validate { src: PathBuf },
}

pub async fn run(command: ZipCommand, config: &OcrdConfig) -> Result<ExitCode> {
    let resolver = Resolver::new(config.resolver.clone())?;
    match command {
        ZipCommand::Bag {
            directory,
            mets_basename,
            identifier,
            dest,
            ocrd_mets,
            base_version_checksum,
            manifestation_depth,
            skip_zip,
        } => {
            let workspace = Workspace::new(resolver.clone(), &directory, Some(mets_basename.as_str()))
                .await
                .with_context(|| format!("Opening workspace in {}", directory.display()))?;
            let options = BagOptions {
                ocrd_identifier: identifier,
                dest,
                ocrd_mets,
                manifestation_depth: manifestation_depth.parse::<ManifestationDepth>()?,
                base_version_checksum,
                skip_zip,
            };
            let bag = WorkspaceBagger::new(resolver).bag(&workspace, &options).await?;
            println!("{}", bag.display());
        }
        ZipCommand::Spill { src, dest } => {
            let workspace = WorkspaceBagger::new(resolver).spill(&src, &dest).await?;
            println!("{}", workspace.directory().display());
        }
        ZipCommand::Validate { src } => {
            let report = OcrdZipValidator::validate(&src);
            println!("{report}");
            if !report.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
