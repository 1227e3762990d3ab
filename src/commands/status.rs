//! Print the mounted NTFS volumes.
use anyhow::Result;

use crate::context::Context;
use crate::ntfs::status::{StatusFilter, collect, report};

/// Build the status report for `filter`.
///
/// # Errors
///
/// Returns an error if `lsblk` fails or the mount table cannot be read.
pub fn render(ctx: &Context, filter: &StatusFilter) -> Result<String> {
    let rows = collect(ctx.executor.as_ref(), &ctx.config.paths().mounts, filter)?;
    ctx.log
        .debug(&format!("{} mounted NTFS volume(s) match", rows.len()));
    Ok(report(&rows))
}

/// Print the status report to stdout.
///
/// # Errors
///
/// See [`render`].
#[allow(clippy::print_stdout)]
pub fn run(ctx: &Context, filter: &StatusFilter) -> Result<()> {
    println!("{}", render(ctx, filter)?);
    Ok(())
}
