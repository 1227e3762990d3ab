//! Unmount one volume or every mounted NTFS volume.
use std::path::Path;

use anyhow::Result;

use super::{failure_status, finish};
use crate::context::Context;
use crate::logging::{Log as _, Logger, VolumeStatus};
use crate::ntfs::status::{StatusFilter, collect};
use crate::ntfs::unmount::{UnmountOutcome, unmount};

/// Unmount `target`, or every mounted NTFS volume when it is `None`.
///
/// # Errors
///
/// Returns an error if the mounted volumes cannot be listed, or if any
/// unmount failed. Busy volumes are reported but do not fail the run.
pub fn run(ctx: &Context, log: &Logger, target: Option<&Path>, force: bool) -> Result<()> {
    if let Some(target) = target {
        process(ctx, log, target, force);
        return finish(log, "unmount");
    }

    log.stage("Finding mounted NTFS volumes");
    let rows = collect(
        ctx.executor.as_ref(),
        &ctx.config.paths().mounts,
        &StatusFilter::default(),
    )?;
    if rows.is_empty() {
        log.info("no mounted NTFS volumes");
        return Ok(());
    }
    for row in &rows {
        process(ctx, log, &row.mount_point, force);
    }
    finish(log, "unmount")
}

/// Ask first, then unmount lazily whatever holds the volume.
///
/// # Errors
///
/// See [`run`]. Declining is not an error.
pub fn run_forced(ctx: &Context, log: &Logger, target: Option<&Path>) -> Result<()> {
    let what = target.map_or_else(
        || "every mounted NTFS volume".to_string(),
        |t| t.display().to_string(),
    );
    let answer = ctx.prompt.confirm(&format!(
        "Force-unmount {what}? Programs using it lose access."
    ));
    if !answer.is_approved() {
        log.warn("forced unmount cancelled");
        return Ok(());
    }
    run(ctx, log, target, true)
}

fn process(ctx: &Context, log: &Logger, target: &Path, force: bool) {
    let name = target.display().to_string();
    match unmount(ctx, target, force) {
        Ok(UnmountOutcome::Unmounted {
            mount_point,
            removed_dir,
        }) => {
            log.info(&format!("unmounted {}", mount_point.display()));
            let detail = removed_dir.then_some("directory removed");
            log.record(&name, VolumeStatus::Unmounted, detail);
        }
        Ok(UnmountOutcome::NotMounted) => {
            log.record(&name, VolumeStatus::Skipped, Some("not mounted"));
        }
        Err(err) => {
            log.report(&err);
            log.record(&name, failure_status(&err), Some(&err.to_string()));
        }
    }
}
