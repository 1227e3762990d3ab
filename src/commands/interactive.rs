//! Numbered menu over the same commands the flags run.
use std::path::PathBuf;

use anyhow::Result;
use clap::CommandFactory as _;

use super::{Command, dispatch};
use crate::cli::Cli;
use crate::context::Context;
use crate::error::MountError;
use crate::logging::{Log as _, Logger};
use crate::ntfs::status::StatusFilter;

/// What a menu entry needs before it becomes a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    MountAll,
    MountOne,
    Unmount,
    Status,
    Verify,
    Register,
    Help,
    ForcedUnmount,
}

/// Menu order; item `n` is `MENU[n - 1]`.
const MENU: &[(&str, Entry)] = &[
    ("Mount all NTFS volumes", Entry::MountAll),
    ("Mount one volume", Entry::MountOne),
    ("Unmount volumes", Entry::Unmount),
    ("Show status", Entry::Status),
    ("Verify a volume", Entry::Verify),
    ("Register a volume in fstab", Entry::Register),
    ("Help", Entry::Help),
    ("Force-unmount volumes", Entry::ForcedUnmount),
];

/// Parse a menu choice (1-based).
fn choose(input: &str) -> Option<Entry> {
    let index = input.trim().parse::<usize>().ok()?.checked_sub(1)?;
    MENU.get(index).map(|(_, entry)| *entry)
}

/// Ask for a device; empty input cancels.
fn ask_device(ctx: &Context, prompt: &str) -> Option<PathBuf> {
    ctx.prompt
        .read_line(prompt)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// Turn a menu entry into a command, asking for its argument.
fn build(ctx: &Context, entry: Entry) -> Option<Command> {
    let optional = |ctx: &Context| ask_device(ctx, "Device or mount point (empty for all): ");
    match entry {
        Entry::MountAll => Some(Command::MountAll),
        Entry::MountOne => ask_device(ctx, "Device: ").map(Command::MountOne),
        Entry::Unmount => Some(Command::Unmount(optional(ctx))),
        Entry::Status => Some(Command::Status(StatusFilter::default())),
        Entry::Verify => ask_device(ctx, "Device: ").map(Command::Verify),
        Entry::Register => ask_device(ctx, "Device: ").map(Command::Register),
        Entry::Help => Some(Command::Help),
        Entry::ForcedUnmount => Some(Command::ForcedUnmount(optional(ctx))),
    }
}

#[allow(clippy::print_stdout)]
fn print_menu() {
    println!();
    for (number, (label, _)) in (1..).zip(MENU) {
        println!("  {number}) {label}");
    }
    println!("  q) Quit");
}

/// Print command-line usage.
#[allow(clippy::print_stdout)]
pub fn print_help() {
    println!("{}", Cli::command().render_long_help());
}

/// Show the menu until the operator quits or input ends.
///
/// A failing command is reported and the menu shown again.
///
/// # Errors
///
/// Never fails; the signature matches the other handlers.
pub fn run(ctx: &Context, log: &Logger) -> Result<()> {
    loop {
        print_menu();
        let Some(input) = ctx.prompt.read_line("Select: ") else {
            return Ok(());
        };
        if input.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        let Some(entry) = choose(&input) else {
            log.warn(&format!("no menu item {input:?}"));
            continue;
        };
        let Some(command) = build(ctx, entry) else {
            continue;
        };
        if let Err(err) = dispatch(ctx, log, &command) {
            match err.downcast_ref::<MountError>() {
                Some(e) => log.report(e),
                None => log.error(&format!("{err:#}")),
            }
        }
    }
}
