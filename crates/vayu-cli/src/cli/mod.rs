//! CLI for the Vayu media copier.

mod commands;
mod control_socket;
mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vayu_core::config::EngineConfig;

use commands::{run_control, run_copy, run_pending, CopyArgs};
use control_socket::ControlCommand;

/// Top-level CLI for the Vayu media copier.
#[derive(Debug, Parser)]
#[command(name = "vayu")]
#[command(about = "Vayu: copy photos and videos between folders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Copy media from SOURCE into DEST, one file at a time.
    Copy {
        /// Folder to copy from.
        source: PathBuf,
        /// Folder to copy into (must exist).
        dest: PathBuf,
        /// Copy files even if a file with the same name is already in DEST.
        #[arg(long)]
        include_existing: bool,
        /// Copy every regular file, not only images and videos.
        #[arg(long)]
        all: bool,
    },

    /// List media in SOURCE whose names are not yet present in DEST.
    Pending {
        source: PathBuf,
        dest: PathBuf,
        #[arg(long)]
        all: bool,
    },

    /// Pause the running copy.
    Pause,

    /// Resume a paused copy.
    Resume,

    /// Cancel the running copy; the partially written file is removed.
    Cancel,
}

impl CliCommand {
    /// `cfg` is the result of loading the config file; only `copy` needs it.
    pub async fn run_from_args(cfg: Result<EngineConfig>) -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Copy {
                source,
                dest,
                include_existing,
                all,
            } => {
                let cfg = cfg?;
                tracing::debug!("loaded config: {:?}", cfg);
                let args = CopyArgs {
                    source,
                    dest,
                    include_existing,
                    all,
                };
                run_copy(&cfg, args).await?;
            }
            CliCommand::Pending { source, dest, all } => run_pending(&source, &dest, all)?,
            CliCommand::Pause => run_control(ControlCommand::Pause).await?,
            CliCommand::Resume => run_control(ControlCommand::Resume).await?,
            CliCommand::Cancel => run_control(ControlCommand::Cancel).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
