use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{CommandFactory as _, Parser as _};

use ntfs_mount::cli::Cli;
use ntfs_mount::commands::{self, Command};
use ntfs_mount::config::{Config, default_base_dir, load_settings};
use ntfs_mount::context::Context;
use ntfs_mount::error::MountError;
use ntfs_mount::exec::{Executor, SystemExecutor};
use ntfs_mount::logging::{self, Log, Logger};
use ntfs_mount::ntfs::usage::build_probe;
use ntfs_mount::platform::{check_dependencies, require_root, resolve_user};
use ntfs_mount::prompt::StdinPrompt;

fn main() -> Result<()> {
    let args = Cli::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "ntfs-mount",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let settings = load_settings(&args.config)?;
    let sudo_user = std::env::var("SUDO_USER").ok();
    let env_user = std::env::var("USER").ok();
    let user = resolve_user(
        args.user.as_deref(),
        sudo_user.as_deref(),
        env_user.as_deref(),
    )?;

    let mut config = Config::new(user, settings);
    config.base_dir =
        default_base_dir(&config.user, &config.settings, args.mountdir.as_deref())?;
    config.force = args.force;
    config.debug = args.debug;
    config.fstab = args.fstab;
    config.assume_yes = args.yes;

    let log_file = config.log_file();
    logging::init_subscriber(config.debug, Some(&log_file));
    let log = Arc::new(Logger::new(Some(log_file.path)));

    ctrlc::set_handler(|| {
        logging::spinner::clear_line();
        std::process::exit(130);
    })
    .context("installing Ctrl-C handler")?;

    let version = option_env!("NTFS_MOUNT_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.debug(&format!("ntfs-mount {version}"));
    log.debug(&format!(
        "user {}, base directory {}",
        config.user,
        config.base_dir.display()
    ));

    let command = args.operation();
    let result = run(config, &log, &command);
    if let Err(err) = &result
        && let Some(e) = err.downcast_ref::<MountError>()
        && let Some(hint) = e.hint()
    {
        log.info(&format!("hint: {hint}"));
    }
    result
}

/// Preflight checks, then the command itself.
fn run(config: Config, log: &Arc<Logger>, command: &Command) -> Result<()> {
    if command.needs_root() {
        require_root(command.name())?;
    }
    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
    check_dependencies(executor.as_ref(), command.required_tools())?;

    let usage = build_probe(
        config.settings.busy_probe,
        Arc::clone(&executor),
        &config.paths().proc,
    );
    let prompt = Arc::new(StdinPrompt::new(config.assume_yes));
    let ctx = Context::new(
        config,
        Arc::clone(log) as Arc<dyn Log>,
        executor,
        usage,
        prompt,
    );
    commands::dispatch(&ctx, log, command)
}
