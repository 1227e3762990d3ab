//! NTFS volume mount orchestrator.
//!
//! Discovers NTFS block devices, derives safe mount points from their
//! labels, refuses hibernated volumes, mounts through the kernel driver with
//! a FUSE fallback and a single repair, registers volumes in fstab by UUID,
//! and unmounts only what nothing is using.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: settings file and the per-run [`config::Config`]
//! - **[`resources`]**: idempotent `check + apply` primitives (mount point
//!   directories, fstab entries)
//! - **[`ntfs`]**: device discovery, health, mount and unmount executors,
//!   persistence and status
//! - **[`commands`]**: top-level operations and the interactive menu
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod ntfs;
pub mod platform;
pub mod prompt;
pub mod resources;
