//! Command-line flags.
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::commands::Command;
use crate::config::DEFAULT_SETTINGS_PATH;
use crate::ntfs::status::StatusFilter;

/// Command-line interface of the mount orchestrator.
#[derive(Parser, Debug)]
#[command(
    name = "ntfs-mount",
    about = "Mount NTFS volumes safely: health checks, driver fallback, repair",
    version
)]
#[command(group(
    ArgGroup::new("mode")
        .args(["status", "unmount", "verify", "interactive"])
        .multiple(false)
))]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Also add each mounted volume to /etc/fstab
    #[arg(long)]
    pub fstab: bool,

    /// Bypass hibernation, dirty and busy checks
    #[arg(long)]
    pub force: bool,

    /// Account that owns mount points and logs (default: invoking user)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Base directory for mount points (default: /run/media/<user>)
    #[arg(long, value_name = "DIR")]
    pub mountdir: Option<PathBuf>,

    /// Unmount NTFS volumes, or only DEVICE
    #[arg(long, value_name = "DEVICE", num_args = 0..=1)]
    pub unmount: Option<Option<PathBuf>>,

    /// List mounted NTFS volumes
    #[arg(long)]
    pub status: bool,

    /// Only this device (with --status), or mount only this device
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<PathBuf>,

    /// Only this mount point
    #[arg(long, value_name = "DIR", requires = "status")]
    pub mountpoint: Option<PathBuf>,

    /// Check DEVICE for hibernation and dirty state without mounting
    #[arg(long, value_name = "DEVICE")]
    pub verify: Option<PathBuf>,

    /// Verbose console output
    #[arg(long)]
    pub debug: bool,

    /// Choose operations from a numbered menu
    #[arg(long)]
    pub interactive: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Settings file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_SETTINGS_PATH)]
    pub config: PathBuf,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<clap_complete::Shell>,
}

impl Cli {
    /// The operation these flags select.
    #[must_use]
    pub fn operation(&self) -> Command {
        if self.interactive {
            return Command::Interactive;
        }
        if self.status {
            return Command::Status(StatusFilter {
                device: self.device.clone(),
                mount_point: self.mountpoint.clone(),
            });
        }
        if let Some(target) = &self.unmount {
            return Command::Unmount(target.clone().or_else(|| self.device.clone()));
        }
        if let Some(device) = &self.verify {
            return Command::Verify(device.clone());
        }
        self.device
            .clone()
            .map_or(Command::MountAll, Command::MountOne)
    }
}
