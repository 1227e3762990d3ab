//! Check a volume's health without mounting it.
use std::path::Path;

use anyhow::Result;

use crate::context::Context;
use crate::ntfs::device::find_device;
use crate::ntfs::health::{VerifyReport, inspect};

/// Probe `device` and return the findings.
///
/// # Errors
///
/// Returns [`MountError::DeviceNotFound`](crate::error::MountError::DeviceNotFound)
/// for an unknown device, or an error if a probe tool cannot run.
pub fn check(ctx: &Context, device: &Path) -> Result<VerifyReport> {
    let device = find_device(ctx.executor.as_ref(), device)?;
    ctx.log.stage(&format!("Verifying {}", device.path.display()));
    let report = inspect(ctx.executor.as_ref(), &device.path)?;
    if report.health.hibernated || report.health.dirty {
        ctx.log.warn(&format!(
            "{} is {}",
            device.path.display(),
            report.health
        ));
    } else {
        ctx.log
            .info(&format!("{} is clean", device.path.display()));
    }
    Ok(report)
}

/// Probe `device` and print the repair tool's report.
///
/// # Errors
///
/// See [`check`].
#[allow(clippy::print_stdout)]
pub fn run(ctx: &Context, device: &Path) -> Result<()> {
    let report = check(ctx, device)?;
    if !report.report.is_empty() {
        println!("{}", report.report);
    }
    Ok(())
}
